//! Workers driven through the JSON-RPC client against a scripted node.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use pow_core::{Block, MinerError, MinerRegistry, Network};
use pow_worker::rpc::RpcRequest;
use pow_worker::{run_workers, RpcClient, Settings, Transport, WorkerError};
use serde_json::json;

const PAYOUT: &str = "mpXwg4jMtRhuSpVq4xS3HFHmCmWp9NyGKt";

fn install_registry() {
    match MinerRegistry::with_builtin_backends().install() {
        Ok(_) | Err(MinerError::RegistryAlreadyInitialized) => {}
        Err(err) => panic!("unexpected registry error: {}", err),
    }
}

/// Answers `getblocktemplate` with an easy regtest template and accepts
/// every submitted block, raising `stop` once one arrives.
struct ScriptedNode {
    url: String,
    online: bool,
    accepted: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
}

impl Transport for ScriptedNode {
    fn post(&self, body: &str) -> pow_worker::Result<String> {
        assert_eq!(self.url, "http://localhost:18443");
        if !self.online {
            return Err(WorkerError::Transport("connection refused".into()));
        }
        let request: RpcRequest = serde_json::from_str(body)?;
        let result = match request.method.as_str() {
            "getblocktemplate" => json!({
                "version": 0x2000_0000,
                "previousblockhash": "0f9188f13cb7b2c71f2a335e3a4fc328bf5beb436012afca590b1a11466e2206",
                "transactions": [],
                "coinbasevalue": 5_000_000_000u64,
                "curtime": 1_700_000_000u32,
                "bits": "207fffff",
                "height": 1
            }),
            "submitblock" => {
                let hex = request.params[0].as_str().unwrap_or_default();
                let block = Block::from_hex(hex).expect("submitted block decodes");
                assert!(block.header.hash()[31] < 0x80);
                self.accepted.fetch_add(1, Ordering::SeqCst);
                self.stop.store(true, Ordering::SeqCst);
                json!(null)
            }
            other => panic!("unexpected method {}", other),
        };
        Ok(json!({ "result": result, "error": null, "id": request.id }).to_string())
    }
}

fn settings(workers: usize) -> Settings {
    Settings {
        network: Network::Regtest,
        payout_address: PAYOUT.to_string(),
        workers,
        retry_delay_ms: 0,
        report_interval_secs: 0,
        max_consecutive_failures: 2,
        rpc_user: "miner".to_string(),
        ..Settings::default()
    }
}

#[test]
fn test_workers_mine_and_submit() {
    install_registry();
    let stop = Arc::new(AtomicBool::new(false));
    let accepted = Arc::new(AtomicUsize::new(0));

    let summary = run_workers(
        &settings(2),
        |_, settings: &Settings| {
            assert_eq!(settings.rpc_user, "miner");
            RpcClient::new(ScriptedNode {
                url: settings.rpc_url(),
                online: true,
                accepted: Arc::clone(&accepted),
                stop: Arc::clone(&stop),
            })
        },
        Arc::clone(&stop),
    )
    .unwrap();

    assert_eq!(summary.workers.len(), 2);
    let total_accepted: u32 = summary
        .workers
        .iter()
        .map(|worker| worker.as_ref().unwrap().accepted)
        .sum();
    assert!(total_accepted >= 1);
    assert_eq!(total_accepted as usize, accepted.load(Ordering::SeqCst));
    assert!(summary.stats.total_hashes >= 1);
}

#[test]
fn test_offline_node_exhausts_retries() {
    install_registry();
    let stop = Arc::new(AtomicBool::new(false));

    let summary = run_workers(
        &settings(1),
        |_, settings: &Settings| {
            RpcClient::new(ScriptedNode {
                url: settings.rpc_url(),
                online: false,
                accepted: Arc::new(AtomicUsize::new(0)),
                stop: Arc::clone(&stop),
            })
        },
        Arc::clone(&stop),
    )
    .unwrap();

    assert!(matches!(
        summary.workers[0],
        Err(WorkerError::TooManyFailures(2))
    ));
}

#[test]
fn test_setup_errors_surface_before_mining() {
    install_registry();
    let stop = Arc::new(AtomicBool::new(false));
    let never_connect =
        |_: usize, _: &Settings| -> RpcClient<ScriptedNode> { panic!("no worker should start") };

    let unknown_backend = Settings {
        miner_type: "asic".to_string(),
        ..settings(1)
    };
    let err = run_workers(&unknown_backend, never_connect, Arc::clone(&stop)).unwrap_err();
    assert_eq!(err.to_string(), r#"no miner backend registered as "asic""#);

    let wrong_network = Settings {
        network: Network::Mainnet,
        ..settings(1)
    };
    assert!(matches!(
        run_workers(&wrong_network, never_connect, Arc::clone(&stop)),
        Err(WorkerError::Core(pow_core::Error::Address(_)))
    ));

    let too_many = Settings {
        workers: pow_worker::MAX_WORKERS + 1,
        ..settings(1)
    };
    assert!(matches!(
        run_workers(&too_many, never_connect, Arc::clone(&stop)),
        Err(WorkerError::Config(_))
    ));
}
