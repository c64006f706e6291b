use base64::Engine;
use solana_idl_parser::{
    account_discriminator, event_discriminator, load_idl, AccountDecoder, DecodeError,
    EventDecoder, Idl, Value,
};
use std::path::PathBuf;

fn fixture(name: &str) -> Idl {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    load_idl(&path).unwrap()
}

fn b64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn key(byte: u8) -> [u8; 32] {
    [byte; 32]
}

#[test]
fn test_flag_event_decodes_exactly() {
    let decoder = EventDecoder::from_idl(&fixture("klend_legacy.json")).unwrap();

    let mut record = event_discriminator("FlagEvent").to_vec();
    record.extend_from_slice(&[0x01, 0x2A, 0x00]);

    let event = decoder.decode(&b64(&record)).unwrap().unwrap();

    assert_eq!(event.name, "FlagEvent");
    assert_eq!(event.get("flag"), Some(&Value::Bool(true)));
    assert_eq!(event.get("count"), Some(&Value::Unsigned(42)));
    assert_eq!(event.data.len(), 2);
}

#[test]
fn test_borrow_event_round_trip_with_nested_types() {
    let decoder = EventDecoder::from_idl(&fixture("klend_legacy.json")).unwrap();

    let mut record = event_discriminator("BorrowEvent").to_vec();
    record.extend_from_slice(&key(7)); // obligation
    record.extend_from_slice(&1_500_000u64.to_le_bytes()); // amount
    record.push(1); // side = Borrow
    record.extend_from_slice(&30u16.to_le_bytes()); // fee.bps
    record.push(1); // fee.receiver = Some
    record.extend_from_slice(&key(9));
    record.extend_from_slice(&4u32.to_le_bytes()); // memo
    record.extend_from_slice(b"loan");
    record.extend_from_slice(&2u32.to_le_bytes()); // reserves
    record.extend_from_slice(&key(1));
    record.extend_from_slice(&key(2));
    for price in [10u32, 20, 30] {
        record.extend_from_slice(&price.to_le_bytes());
    }
    let mut total = [0u8; 32];
    total[16] = 1; // 2^128
    record.extend_from_slice(&total);

    let event = decoder.decode(&b64(&record)).unwrap().unwrap();

    assert_eq!(event.name, "BorrowEvent");
    assert_eq!(event.get("obligation"), Some(&Value::PublicKey(key(7))));
    assert_eq!(event.get("amount").and_then(Value::as_u64), Some(1_500_000));
    assert_eq!(event.get("side").and_then(Value::as_str), Some("Borrow"));

    let fee = event.get("fee").unwrap();
    assert_eq!(fee.get("bps"), Some(&Value::Unsigned(30)));
    assert_eq!(fee.get("receiver"), Some(&Value::PublicKey(key(9))));

    assert_eq!(
        event.get("memo"),
        Some(&Value::String("loan".to_string()))
    );
    assert_eq!(
        event.get("reserves").and_then(Value::as_list).map(<[Value]>::len),
        Some(2)
    );
    assert_eq!(
        event.get("prices"),
        Some(&Value::List(vec![
            Value::Unsigned(10),
            Value::Unsigned(20),
            Value::Unsigned(30)
        ]))
    );
    assert_eq!(
        event.get("total"),
        Some(&Value::BigInt(
            "340282366920938463463374607431768211456".to_string()
        ))
    );
}

#[test]
fn test_invalid_base64_and_unknown_discriminator_are_skipped() {
    let decoder = EventDecoder::from_idl(&fixture("klend_legacy.json")).unwrap();

    assert_eq!(decoder.decode("%%% not base64 %%%"), Ok(None));

    let mut record = event_discriminator("SomethingElse").to_vec();
    record.extend_from_slice(&[0, 0, 0]);
    assert_eq!(decoder.decode(&b64(&record)), Ok(None));

    assert_eq!(decoder.decode(&b64(&[1, 2])), Ok(None));
}

#[test]
fn test_trailing_bytes_reported_as_error() {
    let decoder = EventDecoder::from_idl(&fixture("klend_legacy.json")).unwrap();

    let mut record = event_discriminator("FlagEvent").to_vec();
    record.extend_from_slice(&[0x00, 0x01, 0x00, 0xFF]);

    assert_eq!(
        decoder.decode(&b64(&record)),
        Err(DecodeError::TrailingBytes {
            layout: "FlagEvent".to_string(),
            remaining: 1
        })
    );
}

#[test]
fn test_truncated_record_reported_as_error() {
    let decoder = EventDecoder::from_idl(&fixture("klend_legacy.json")).unwrap();

    let mut record = event_discriminator("FlagEvent").to_vec();
    record.push(0x01);

    assert!(matches!(
        decoder.decode(&b64(&record)),
        Err(DecodeError::UnexpectedEof { .. })
    ));
}

#[test]
fn test_legacy_inline_account() {
    let idl = fixture("klend_legacy.json");
    let decoder = AccountDecoder::from_idl(&idl).unwrap();
    assert_eq!(decoder.len(), 1);

    let mut data = account_discriminator("Obligation").to_vec();
    data.extend_from_slice(&key(3));
    data.extend_from_slice(&(u128::from(u64::MAX) + 5).to_le_bytes());
    data.push(2);

    let account = decoder.decode(&data).unwrap().unwrap();
    assert_eq!(account.name, "Obligation");
    assert_eq!(
        account.get("depositedValueSf"),
        Some(&Value::Unsigned(u128::from(u64::MAX) + 5))
    );
    assert_eq!(account.get("elevationGroup"), Some(&Value::Unsigned(2)));
}

#[test]
fn test_new_format_event_uses_explicit_discriminator_and_types() {
    let idl = fixture("marginfi_v030.json");
    assert_eq!(idl.program_name(), Some("marginfi"));
    let decoder = EventDecoder::from_idl(&idl).unwrap();

    let mut record = vec![1, 2, 3, 4, 5, 6, 7, 8];
    record.push(0); // header.signer = None
    record.extend_from_slice(&key(4)); // header.marginfi_account
    record.extend_from_slice(&key(5)); // bank
    record.extend_from_slice(&250u64.to_le_bytes());

    let event = decoder.decode(&b64(&record)).unwrap().unwrap();

    assert_eq!(event.name, "LendingAccountDepositEvent");
    let header = event.get("header").unwrap();
    assert!(header.get("signer").unwrap().is_null());
    assert_eq!(header.get("marginfi_account"), Some(&Value::PublicKey(key(4))));
    assert_eq!(event.get("amount").and_then(Value::as_u64), Some(250));

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["name"], "LendingAccountDepositEvent");
    assert_eq!(json["data"]["amount"], 250);
    assert_eq!(json["data"]["bank"], Value::PublicKey(key(5)).to_json());
    assert!(json["data"]["bank"].as_str().is_some());
}

#[test]
fn test_new_format_account_with_enum_and_padding() {
    let decoder = AccountDecoder::from_idl(&fixture("marginfi_v030.json")).unwrap();

    let mut data = vec![142, 49, 166, 242, 50, 66, 97, 188];
    data.extend_from_slice(&key(6));
    data.push(6);
    data.push(1); // risk_tier = Isolated
    data.extend_from_slice(&[0u8; 16]);

    let bank = decoder.decode(&data).unwrap().unwrap();
    assert_eq!(bank.get("mint_decimals"), Some(&Value::Unsigned(6)));
    let config = bank.get("config").unwrap();
    assert_eq!(config.get("risk_tier").and_then(Value::as_str), Some("Isolated"));
}
