//! Decoding against payloads produced by an independent ABI encoder.

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, FixedBytes, I256, U256};
use chainsync_core::{hash::Keccak256, DecodedValue, LogEntry, SchemaEntry};
use chainsync_evm::{compute_function_selector, Decoder};

const ROUTER_ABI: &str = r#"[
    {"type":"function","name":"fill","stateMutability":"nonpayable","inputs":[
        {"name":"order","type":"tuple","internalType":"struct Router.Order","components":[
            {"name":"maker","type":"address"},
            {"name":"amounts","type":"uint256[]"},
            {"name":"memo","type":"string"}
        ]},
        {"name":"id","type":"bytes32"},
        {"name":"tick","type":"int24"}
    ],"outputs":[]},
    {"type":"function","name":"batch","stateMutability":"nonpayable","inputs":[
        {"name":"legs","type":"tuple[]","components":[
            {"name":"pool","type":"address"},
            {"name":"data","type":"bytes"}
        ]},
        {"name":"grid","type":"uint8[2][]"}
    ],"outputs":[]},
    {"type":"event","name":"Swap","anonymous":false,"inputs":[
        {"indexed":true,"name":"sender","type":"address"},
        {"indexed":false,"name":"amount0In","type":"uint256"},
        {"indexed":false,"name":"amount1In","type":"uint256"},
        {"indexed":false,"name":"amount0Out","type":"uint256"},
        {"indexed":false,"name":"amount1Out","type":"uint256"},
        {"indexed":true,"name":"to","type":"address"}
    ]},
    {"type":"event","name":"Transfer","anonymous":false,"inputs":[
        {"indexed":true,"name":"from","type":"address"},
        {"indexed":true,"name":"to","type":"address"},
        {"indexed":false,"name":"value","type":"uint256"}
    ]},
    {"type":"event","name":"Tagged","anonymous":false,"inputs":[
        {"indexed":true,"name":"tag","type":"string"},
        {"indexed":false,"name":"note","type":"string"}
    ]}
]"#;

const TRANSFER_TOPIC: &str = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";
const SWAP_TOPIC: &str = "0xd78ad95fa46c994b6551d0da85fc275fe613ce37657fb8d5e3d130840159d822";

fn decoder() -> Decoder {
    let mut d = Decoder::new();
    d.register_json(ROUTER_ABI).unwrap();
    d
}

fn entry(name: &str) -> SchemaEntry {
    SchemaEntry::list_from_json(ROUTER_ABI)
        .unwrap()
        .into_iter()
        .find(|e| e.name == name)
        .unwrap()
}

fn calldata(name: &str, args: Vec<DynSolValue>) -> Vec<u8> {
    let mut out = compute_function_selector(&entry(name), &Keccak256).to_vec();
    out.extend(DynSolValue::Tuple(args).abi_encode_params());
    out
}

fn topic_for(addr: Address) -> String {
    format!("0x{}", hex::encode(addr.into_word()))
}

fn log(topics: Vec<String>, data: Vec<u8>) -> LogEntry {
    LogEntry {
        address: "0xc2edad668740f1aa35e4d8f227fb8e17dca888cd".into(),
        topics,
        data,
        block_number: 10_750_001,
        log_index: 0,
        transaction_hash: String::new(),
        removed: false,
    }
}

#[test]
fn canonical_signatures() {
    assert_eq!(entry("fill").signature(), "fill((address,uint256[],string),bytes32,int24)");
    assert_eq!(entry("batch").signature(), "batch((address,bytes)[],uint8[2][])");
}

#[test]
fn nested_tuple_with_dynamic_members() {
    let maker = Address::from([0x11u8; 20]);
    let id = FixedBytes::<32>::from([0xabu8; 32]);
    let data = calldata(
        "fill",
        vec![
            DynSolValue::Tuple(vec![
                DynSolValue::Address(maker),
                DynSolValue::Array(vec![
                    DynSolValue::Uint(U256::from(1u64), 256),
                    DynSolValue::Uint(U256::MAX, 256),
                ]),
                DynSolValue::String("gm".into()),
            ]),
            DynSolValue::FixedBytes(id, 32),
            DynSolValue::Int(I256::try_from(-887_272i64).unwrap(), 24),
        ],
    );

    let call = decoder().decode_method_call(&data).unwrap();
    assert_eq!(call.schema_name, "fill");

    let order = call.param("order").unwrap();
    assert_eq!(
        order.field("maker").and_then(|v| v.as_address()),
        Some("0x1111111111111111111111111111111111111111")
    );
    let amounts = order.field("amounts").and_then(|v| v.as_array()).unwrap();
    assert_eq!(amounts[0].as_integer(), Some("1"));
    assert_eq!(amounts[1].as_integer(), Some(U256::MAX.to_string().as_str()));
    assert_eq!(order.field("memo"), Some(&DecodedValue::Str("gm".into())));

    assert_eq!(
        call.param("id"),
        Some(&DecodedValue::FixedBytes(format!("0x{}", "ab".repeat(32))))
    );
    assert_eq!(call.param("tick"), Some(&DecodedValue::Int("-887272".into())));
}

#[test]
fn dynamic_array_of_tuples_and_fixed_arrays() {
    let pool = Address::from([0x22u8; 20]);
    let data = calldata(
        "batch",
        vec![
            DynSolValue::Array(vec![
                DynSolValue::Tuple(vec![
                    DynSolValue::Address(pool),
                    DynSolValue::Bytes(vec![0xde, 0xad]),
                ]),
                DynSolValue::Tuple(vec![DynSolValue::Address(pool), DynSolValue::Bytes(vec![])]),
            ]),
            DynSolValue::Array(vec![DynSolValue::FixedArray(vec![
                DynSolValue::Uint(U256::from(3u64), 8),
                DynSolValue::Uint(U256::from(255u64), 8),
            ])]),
        ],
    );

    let call = decoder().decode_method_call(&data).unwrap();
    let legs = call.param("legs").and_then(|v| v.as_array()).unwrap();
    assert_eq!(legs.len(), 2);
    assert_eq!(legs[0].field("data"), Some(&DecodedValue::Bytes("0xdead".into())));
    assert_eq!(legs[1].field("data"), Some(&DecodedValue::Bytes("0x".into())));

    let grid = call.param("grid").and_then(|v| v.as_array()).unwrap();
    let row = grid[0].as_array().unwrap();
    assert_eq!(row[0].as_integer(), Some("3"));
    assert_eq!(row[1].as_integer(), Some("255"));
}

#[test]
fn truncated_calldata_is_rejected() {
    let data = calldata(
        "batch",
        vec![
            DynSolValue::Array(vec![DynSolValue::Tuple(vec![
                DynSolValue::Address(Address::ZERO),
                DynSolValue::Bytes(vec![1; 40]),
            ])]),
            DynSolValue::Array(vec![]),
        ],
    );
    let err = decoder().decode_method_call(&data[..data.len() - 32]).unwrap_err();
    assert!(matches!(err, chainsync_core::DecodeError::DataTooShort { .. }));
}

#[test]
fn transfer_log() {
    let from = Address::from([0x01u8; 20]);
    let to = Address::from([0x02u8; 20]);
    let data = DynSolValue::Uint(U256::from(1_000_000u64), 256).abi_encode();
    let entry = log(vec![TRANSFER_TOPIC.into(), topic_for(from), topic_for(to)], data);

    let events = decoder().decode_logs(&[entry]).unwrap();
    assert_eq!(events.len(), 1);
    let ev = &events[0];
    assert_eq!(ev.schema_name, "Transfer");
    assert_eq!(ev.contract_address, "0xc2edad668740f1aa35e4d8f227fb8e17dca888cd");
    let names: Vec<_> = ev.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["from", "to", "value"]);
    assert_eq!(
        ev.param("to").and_then(|v| v.as_address()),
        Some("0x0202020202020202020202020202020202020202")
    );
    assert_eq!(ev.param("value").and_then(|v| v.as_integer()), Some("1000000"));
}

#[test]
fn swap_log_merges_topics_in_declared_order() {
    let sender = Address::from([0x0au8; 20]);
    let to = Address::from([0x0bu8; 20]);
    let data = DynSolValue::Tuple(vec![
        DynSolValue::Uint(U256::from(0u64), 256),
        DynSolValue::Uint(U256::from(500u64), 256),
        DynSolValue::Uint(U256::from(42u64), 256),
        DynSolValue::Uint(U256::from(0u64), 256),
    ])
    .abi_encode_params();
    let entry = log(vec![SWAP_TOPIC.into(), topic_for(sender), topic_for(to)], data);

    let ev = decoder().decode_log(&entry).unwrap().unwrap();
    let names: Vec<_> = ev.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["sender", "amount0In", "amount1In", "amount0Out", "amount1Out", "to"]);
    assert_eq!(ev.param("amount1In").and_then(|v| v.as_integer()), Some("500"));
    assert_eq!(
        ev.param("to").and_then(|v| v.as_address()),
        Some("0x0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b")
    );
}

#[test]
fn indexed_string_yields_topic_hash() {
    let tag_hash = format!("0x{}", "7e".repeat(32));
    let topic0 = format!(
        "0x{}",
        hex::encode(chainsync_core::hash::keccak256(b"Tagged(string,string)"))
    );
    let data = DynSolValue::Tuple(vec![DynSolValue::String("hello".into())]).abi_encode_params();
    let ev = decoder()
        .decode_log(&log(vec![topic0, tag_hash.clone()], data))
        .unwrap()
        .unwrap();
    assert_eq!(ev.param("tag"), Some(&DecodedValue::FixedBytes(tag_hash)));
    assert_eq!(ev.param("note"), Some(&DecodedValue::Str("hello".into())));
}

#[test]
fn unmatched_and_topicless_logs_are_omitted() {
    let unknown = log(vec![format!("0x{}", "00".repeat(32))], vec![]);
    let bare = log(vec![], vec![]);
    let events = decoder().decode_logs(&[unknown, bare]).unwrap();
    assert!(events.is_empty());
}

#[test]
fn parallel_decode_preserves_order() {
    let logs: Vec<_> = (0..64u64)
        .map(|i| {
            let data = DynSolValue::Uint(U256::from(i), 256).abi_encode();
            let mut entry = log(
                vec![
                    TRANSFER_TOPIC.into(),
                    topic_for(Address::ZERO),
                    topic_for(Address::ZERO),
                ],
                data,
            );
            entry.log_index = i;
            entry
        })
        .collect();

    let d = decoder();
    let par = d.decode_logs_par(&logs).unwrap();
    assert_eq!(par, d.decode_logs(&logs).unwrap());
    assert_eq!(par[63].param("value").and_then(|v| v.as_integer()), Some("63"));
}

#[test]
fn missing_indexed_topic_is_an_error() {
    let data = DynSolValue::Uint(U256::from(1u64), 256).abi_encode();
    let entry = log(vec![TRANSFER_TOPIC.into(), topic_for(Address::ZERO)], data);
    assert!(matches!(
        decoder().decode_log(&entry),
        Err(chainsync_core::DecodeError::MissingTopic { index: 2 })
    ));
}
