//! End-to-end block assembly and nonce search.

use pow_core::{
    decode_address, hash_to_display_hex, BlockTemplate, Block, MineOutcome, Miner, MinerError,
    MinerRegistry, MerkleTree, Network, SearchControl, Transaction,
};

const GENESIS_COINBASE_HEX: &str = "01000000010000000000000000000000000000000000000000000000000000000000000000ffffffff4d04ffff001d0104455468652054696d65732030332f4a616e2f32303039204368616e63656c6c6f72206f6e206272696e6b206f66207365636f6e64206261696c6f757420666f722062616e6b73ffffffff0100f2052a01000000434104678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f61deb649f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf11d5fac00000000";

const GENESIS_HASH: &str = "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f";

fn registry() -> &'static MinerRegistry {
    match MinerRegistry::with_builtin_backends().install() {
        Ok(registry) => registry,
        Err(MinerError::RegistryAlreadyInitialized) => MinerRegistry::global().unwrap(),
        Err(err) => panic!("unexpected registry error: {}", err),
    }
}

fn genesis_block() -> Block {
    let mut block = Block::new(1, 1231006505, 0x1d00ffff);
    block.append_transaction(Transaction::from_hex(GENESIS_COINBASE_HEX).unwrap());
    block.update_header();
    block
}

#[test]
fn test_genesis_block_assembly() {
    let mut block = genesis_block();

    let mut tree = MerkleTree::new();
    tree.append(block.transactions()[0].txid());
    assert_eq!(block.header.merkle_root, tree.root_hash());

    block.header.nonce = 2083236893;
    let serialized = block.header.serialize();
    assert_eq!(pow_core::double_sha256(&serialized), block.header.hash());
    assert_eq!(hash_to_display_hex(&block.header.hash()), GENESIS_HASH);

    let hex = block.to_hex();
    assert!(hex.ends_with(GENESIS_COINBASE_HEX));
    assert_eq!(&hex[160..162], "01");
}

#[test]
fn test_mine_genesis_from_known_nonce() {
    registry();
    let mut block = genesis_block();
    block.header.nonce = 2083236893;

    let mut miner = Miner::from_registry("cpu").unwrap();
    let outcome = miner.mine(&mut block, &SearchControl::new());

    let MineOutcome::SolutionFound { nonce, hash } = outcome else {
        panic!("expected the genesis solution, got {:?}", outcome);
    };
    assert_eq!(nonce, 2083236893);
    assert_eq!(hash_to_display_hex(&hash), GENESIS_HASH);
}

#[test]
fn test_unknown_backend() {
    registry();
    assert_eq!(
        Miner::from_registry("asic").err().map(|err| err.to_string()),
        Some("no miner backend registered as \"asic\"".to_string())
    );
}

#[test]
fn test_template_to_solved_block() {
    registry();
    let template = BlockTemplate::from_json(
        r#"{
            "version": 536870912,
            "previousblockhash": "0f9188f13cb7b2c71f2a335e3a4fc328bf5beb436012afca590b1a11466e2206",
            "transactions": [],
            "coinbasevalue": 5000000000,
            "curtime": 1700000000,
            "bits": "207fffff",
            "height": 1,
            "longpollid": "ignored"
        }"#,
    )
    .unwrap();
    let payout = decode_address("mpXwg4jMtRhuSpVq4xS3HFHmCmWp9NyGKt", Network::Regtest).unwrap();

    let mut block = Block::from_template(&template, &payout.pubkey_hash).unwrap();
    let mut miner = Miner::from_registry("cpu").unwrap();

    let mut extra_nonce = 0;
    let hash = loop {
        match miner.mine(&mut block, &SearchControl::new()) {
            MineOutcome::SolutionFound { hash, .. } => break hash,
            MineOutcome::NoSolutionFound { .. } => {
                extra_nonce += 1;
                block.set_extra_nonce(extra_nonce).unwrap();
            }
        }
    };

    assert_eq!(block.header.hash(), hash);
    let parsed = Block::from_hex(&block.to_hex()).unwrap();
    assert_eq!(parsed.header, block.header);
    assert_eq!(parsed.transactions()[0].outputs[0].script_pubkey, payout.script_pubkey());
}
