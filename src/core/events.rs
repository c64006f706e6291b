//! Event extraction from program logs.
//!
//! Anchor programs emit events as `Program data: <base64>` log lines. The
//! emitting program is whichever invocation is on top of the stack when the
//! line appears, so nested CPIs are attributed correctly and only that
//! program's [`EventDecoder`] is consulted.

use crate::types::records::RawTransactionRecord;
use crate::utils::error::{CollectorError, Result};
use serde::Serialize;
use solana_idl_parser::{load_idl, DecodeError, DecodedEvent, EventDecoder, Idl};
use solana_transaction_status::option_serializer::OptionSerializer;
use solana_transaction_status::EncodedTransactionWithStatusMeta;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

const PROGRAM_DATA_PREFIX: &str = "Program data: ";

/// A decoded event and the program that emitted it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramEvent {
    pub program_id: String,
    pub event: DecodedEvent,
}

/// A record that matched a known discriminator but not its layout.
#[derive(Debug)]
pub struct EventDecodeFailure {
    pub program_id: String,
    pub error: DecodeError,
}

/// Everything extracted from one transaction's logs.
///
/// A layout mismatch on one record does not hide the events around it.
#[derive(Debug, Default)]
pub struct DecodedLogs {
    /// Decoded events in log order.
    pub events: Vec<ProgramEvent>,
    pub failures: Vec<EventDecodeFailure>,
}

/// One line of a program log, as far as event extraction is concerned.
#[derive(Debug, PartialEq, Eq)]
enum LogLine<'a> {
    Invoke(&'a str),
    Exit,
    Data(&'a str),
    Other,
}

fn classify(log: &str) -> LogLine<'_> {
    if let Some(data) = log.strip_prefix(PROGRAM_DATA_PREFIX) {
        return LogLine::Data(data.trim());
    }
    let Some((program_id, rest)) = log
        .strip_prefix("Program ")
        .and_then(|tail| tail.split_once(' '))
    else {
        return LogLine::Other;
    };
    if rest.starts_with("invoke [") {
        LogLine::Invoke(program_id)
    } else if rest == "success" || rest.starts_with("failed") {
        LogLine::Exit
    } else {
        LogLine::Other
    }
}

/// Routes `Program data:` records to per-program event decoders.
#[derive(Default, Clone)]
pub struct ProgramLogDecoder {
    decoders: HashMap<String, Arc<EventDecoder>>,
}

impl ProgramLogDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the event decoder for `program_id`, replacing any previous one.
    pub fn register(&mut self, program_id: impl Into<String>, decoder: EventDecoder) -> &mut Self {
        self.decoders.insert(program_id.into(), Arc::new(decoder));
        self
    }

    /// Compiles `idl` and registers it under `program_id`, falling back to
    /// the address declared in the IDL.
    ///
    /// # Errors
    ///
    /// `IdlError` when the IDL does not compile, `ConfigError` when no
    /// program id is known.
    pub fn register_idl(&mut self, program_id: Option<&str>, idl: &Idl) -> Result<&mut Self> {
        let program_id = program_id
            .map(ToString::to_string)
            .or_else(|| idl.address.clone())
            .or_else(|| idl.metadata.as_ref().and_then(|m| m.address.clone()))
            .ok_or_else(|| {
                CollectorError::ConfigError(format!(
                    "IDL {} declares no address and none was given",
                    idl.program_name().unwrap_or("<unnamed>")
                ))
            })?;
        let decoder = EventDecoder::from_idl(idl)?;
        tracing::debug!(%program_id, events = decoder.len(), "Registered event decoder");
        Ok(self.register(program_id, decoder))
    }

    /// Loads every `*.json` IDL in `dir`, keyed by the address each declares.
    ///
    /// # Errors
    ///
    /// `ConfigError` when the directory or a file cannot be read or parsed,
    /// `IdlError` when an IDL does not compile.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            CollectorError::ConfigError(format!("Cannot read IDL directory {}: {e}", dir.display()))
        })?;
        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut decoder = Self::new();
        for path in paths {
            let idl = load_idl(&path).map_err(|e| CollectorError::ConfigError(format!("{e:#}")))?;
            decoder.register_idl(None, &idl)?;
        }
        Ok(decoder)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    #[must_use]
    pub fn is_registered(&self, program_id: &str) -> bool {
        self.decoders.contains_key(program_id)
    }

    /// Decodes every event in a transaction's log messages, in log order.
    ///
    /// Records from unregistered programs, invalid base64 and unknown
    /// discriminators are skipped. A record that matches a known
    /// discriminator but not its layout (the IDL and the deployed program
    /// disagree) lands in [`DecodedLogs::failures`].
    #[must_use]
    pub fn decode_logs<S: AsRef<str>>(&self, logs: &[S]) -> DecodedLogs {
        let mut stack: Vec<&str> = Vec::new();
        let mut decoded = DecodedLogs::default();

        for log in logs {
            match classify(log.as_ref()) {
                LogLine::Invoke(program_id) => stack.push(program_id),
                LogLine::Exit => {
                    stack.pop();
                }
                LogLine::Data(data) => {
                    let Some(program_id) = stack.last() else {
                        continue;
                    };
                    let Some(decoder) = self.decoders.get(*program_id) else {
                        continue;
                    };
                    match decoder.decode(data) {
                        Ok(Some(event)) => decoded.events.push(ProgramEvent {
                            program_id: (*program_id).to_string(),
                            event,
                        }),
                        Ok(None) => {}
                        Err(error) => decoded.failures.push(EventDecodeFailure {
                            program_id: (*program_id).to_string(),
                            error,
                        }),
                    }
                }
                LogLine::Other => {}
            }
        }

        decoded
    }

    /// Decodes the events of a fetched transaction.
    #[must_use]
    pub fn decode_transaction(&self, transaction: &EncodedTransactionWithStatusMeta) -> DecodedLogs {
        let Some(meta) = &transaction.meta else {
            return DecodedLogs::default();
        };
        match &meta.log_messages {
            OptionSerializer::Some(logs) => self.decode_logs(logs),
            _ => DecodedLogs::default(),
        }
    }

    /// Decodes the events of a stored record. Records without payload yield nothing.
    #[must_use]
    pub fn decode_record(&self, record: &RawTransactionRecord) -> DecodedLogs {
        let Some(logs) = record
            .payload
            .as_ref()
            .and_then(|payload| payload.pointer("/meta/logMessages"))
            .and_then(serde_json::Value::as_array)
        else {
            return DecodedLogs::default();
        };
        let logs: Vec<&str> = logs.iter().filter_map(serde_json::Value::as_str).collect();
        self.decode_logs(&logs)
    }
}
