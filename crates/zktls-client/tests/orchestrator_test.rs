//! Integration tests for the zkTLS orchestration pipeline
//!
//! Every test drives `ZktlsClient` against `MockGateway` in virtual time, so
//! backoff waits and the attest timeout elapse instantly.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dvc_common::{
    AttestParams, Error, RequestDescriptor, RequestParams, ResolveOp, ResponseResolveRule,
    VerificationType,
};
use dvc_zktls_client::{AlgorithmType, ChainConfig, MockGateway, ZktlsClient, ZktlsOptions};
use tokio::time::Instant;

// Well-known development key, never funded
const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

fn chain() -> ChainConfig {
    ChainConfig::new(TEST_KEY, "84532", "http://127.0.0.1:8545")
}

fn scenario_params() -> RequestParams {
    RequestParams::single(
        RequestDescriptor {
            url: "https://x".to_string(),
            method: "GET".to_string(),
            header: Default::default(),
            body: String::new(),
        },
        vec![ResponseResolveRule::json("h", "$", ResolveOp::Sha256Ex)],
    )
}

fn client_for(gateway: &Arc<MockGateway>) -> ZktlsClient<Arc<MockGateway>> {
    ZktlsClient::new(Arc::clone(gateway), chain())
}

#[tokio::test(start_paused = true)]
async fn test_scenario_a_all_steps_succeed() {
    let gateway = Arc::new(MockGateway::new("task-a"));
    let client = client_for(&gateway);

    let data = client
        .do_zktls(scenario_params(), ZktlsOptions::default())
        .await
        .expect("orchestration should succeed");

    assert_eq!(
        data.attestation_data.verification_type,
        VerificationType::HashComparison
    );
    assert_eq!(data.request_id, "task-a");
    assert_eq!(data.attestation_data.public_data.len(), 1);
    assert_eq!(
        data.attestation_data.private_data.plain_json_response,
        r#"{"code":"0","data":[]}"#
    );

    let calls = gateway.calls();
    assert_eq!(calls.init, 1);
    assert_eq!(calls.submit_task, 1);
    assert_eq!(calls.attest, 1);
    assert_eq!(calls.verify_and_poll, 1);
    assert_eq!(calls.get_all_json_response, 1);
}

#[tokio::test(start_paused = true)]
async fn test_scenario_b_attest_recovers_after_two_failures() {
    let baseline = client_for(&Arc::new(MockGateway::new("task-a")))
        .do_zktls(scenario_params(), ZktlsOptions::default())
        .await
        .unwrap();

    let gateway = Arc::new(MockGateway::new("task-a").failing_attests(2));
    let client = client_for(&gateway);
    let start = Instant::now();

    let data = client
        .do_zktls(scenario_params(), ZktlsOptions::default())
        .await
        .unwrap();

    assert_eq!(data, baseline);
    assert_eq!(gateway.calls().attest, 3);
    assert!(start.elapsed() >= Duration::from_millis(1000 + 2000));
}

#[tokio::test(start_paused = true)]
async fn test_scenario_c_empty_plain_response_is_fatal() {
    for plain in [Some(String::new()), None] {
        let gateway = Arc::new(MockGateway::new("task-c").with_plain_json_response(plain));
        let client = client_for(&gateway);

        let err = client
            .do_zktls(scenario_params(), ZktlsOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err.root(), Error::EmptyPlainResponse));
        assert_eq!(
            err.to_string(),
            "ZKTLS execution failed: Unable to get plain JSON response"
        );
        assert_eq!(gateway.calls().get_all_json_response, 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_invalid_input_makes_no_gateway_calls() {
    let rule = ResponseResolveRule::json("h", "$", ResolveOp::Sha256Ex);
    let cases = [
        RequestParams::new(vec![], vec![]),
        RequestParams::new(vec![RequestDescriptor::get("https://x")], vec![]),
        RequestParams::new(vec![], vec![vec![rule.clone()]]),
        RequestParams::new(
            vec![RequestDescriptor::get("https://x")],
            vec![vec![rule.clone()], vec![rule]],
        ),
    ];

    for params in cases {
        let gateway = Arc::new(MockGateway::new("task-v"));
        let err = client_for(&gateway)
            .do_zktls(params, ZktlsOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err.root(), Error::InvalidInput));
        assert_eq!(gateway.calls().total(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_missing_signing_key_fails_before_init() {
    let gateway = Arc::new(MockGateway::new("task-k"));
    let chain = ChainConfig {
        private_key: None,
        ..chain()
    };
    let client = ZktlsClient::new(Arc::clone(&gateway), chain);

    let err = client
        .do_zktls(scenario_params(), ZktlsOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err.root(), Error::MissingConfig("PRIVATE_KEY")));
    assert_eq!(
        err.to_string(),
        "ZKTLS execution failed: Missing environment variable: PRIVATE_KEY"
    );
    assert_eq!(gateway.calls().init, 0);
    assert_eq!(gateway.calls().total(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_init_failure_is_not_retried() {
    let gateway = Arc::new(MockGateway::new("task-i").failing_init());

    let err = client_for(&gateway)
        .do_zktls(scenario_params(), ZktlsOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err.root(), Error::Init(_)));
    assert!(err.to_string().contains("PrimusNetwork init failed"));
    assert_eq!(gateway.calls().init, 1);
    assert_eq!(gateway.calls().submit_task, 0);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_signing_key_is_an_init_failure() {
    let gateway = Arc::new(MockGateway::new("task-i"));
    let chain = ChainConfig::new("0xnot-hex", "84532", "http://127.0.0.1:8545");

    let err = ZktlsClient::new(Arc::clone(&gateway), chain)
        .do_zktls(scenario_params(), ZktlsOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err.root(), Error::Init(_)));
    assert_eq!(gateway.calls().total(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_submit_exhaustion_names_operation_and_retries() {
    let gateway = Arc::new(MockGateway::new("task-s").failing_submits(6));

    let err = client_for(&gateway)
        .do_zktls(scenario_params(), ZktlsOptions::default())
        .await
        .unwrap_err();

    match err.root() {
        Error::RetriesExhausted {
            operation, retries, ..
        } => {
            assert_eq!(operation, "submitTask ZKTLS");
            assert_eq!(*retries, 5);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err
        .to_string()
        .starts_with("ZKTLS execution failed: submitTask ZKTLS failed after 5 retries"));
    assert_eq!(gateway.calls().submit_task, 6);
    assert_eq!(gateway.calls().attest, 0);
}

#[tokio::test(start_paused = true)]
async fn test_submit_recovers_within_budget() {
    let gateway = Arc::new(MockGateway::new("task-s").failing_submits(5));
    let start = Instant::now();

    client_for(&gateway)
        .do_zktls(scenario_params(), ZktlsOptions::default())
        .await
        .unwrap();

    assert_eq!(gateway.calls().submit_task, 6);
    assert!(start.elapsed() >= Duration::from_millis(1000 + 2000 + 4000 + 8000 + 16000));
}

#[tokio::test(start_paused = true)]
async fn test_missing_attestation_counts_toward_attest_budget() {
    let gateway = Arc::new(MockGateway::new("task-m").missing_attestations(2));
    client_for(&gateway)
        .do_zktls(scenario_params(), ZktlsOptions::default())
        .await
        .unwrap();
    assert_eq!(gateway.calls().attest, 3);

    let gateway = Arc::new(MockGateway::new("task-m").missing_attestations(4));
    let err = client_for(&gateway)
        .do_zktls(scenario_params(), ZktlsOptions::default())
        .await
        .unwrap_err();

    match err.root() {
        Error::RetriesExhausted {
            operation,
            retries,
            last_error,
        } => {
            assert_eq!(operation, "attest");
            assert_eq!(*retries, 3);
            assert_eq!(last_error, "invalid attestation result");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(gateway.calls().attest, 4);
    assert_eq!(gateway.calls().verify_and_poll, 0);
}

#[tokio::test(start_paused = true)]
async fn test_callback_invoked_once_per_attest_attempt() {
    let gateway = Arc::new(MockGateway::new("task-cb").failing_attests(2));
    let invocations = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&invocations);
    let options = ZktlsOptions::default().with_request_params_callback(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RequestParams::single(
            RequestDescriptor::get(format!("https://x?attempt={}", n)),
            vec![ResponseResolveRule::json("h", "$", ResolveOp::Sha256Ex)],
        ))
    });

    client_for(&gateway)
        .do_zktls(scenario_params(), options)
        .await
        .unwrap();

    assert_eq!(invocations.load(Ordering::SeqCst), gateway.calls().attest);
    assert_eq!(invocations.load(Ordering::SeqCst), 3);

    let sent = gateway.last_attest_params().await.unwrap();
    assert_eq!(sent["requests"][0]["url"], "https://x?attempt=3");
}

#[tokio::test(start_paused = true)]
async fn test_callback_failure_consumes_an_attempt() {
    let gateway = Arc::new(MockGateway::new("task-cb"));
    let invocations = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&invocations);
    let options = ZktlsOptions::default().with_request_params_callback(move || {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            anyhow::bail!("clock skew while signing");
        }
        Ok(scenario_params())
    });

    client_for(&gateway)
        .do_zktls(scenario_params(), options)
        .await
        .unwrap();

    assert_eq!(invocations.load(Ordering::SeqCst), 2);
    assert_eq!(gateway.calls().attest, 1);
}

#[tokio::test(start_paused = true)]
async fn test_callback_failure_reason_reaches_caller() {
    let gateway = Arc::new(MockGateway::new("task-cb"));
    let options = ZktlsOptions::default()
        .with_request_params_callback(|| anyhow::bail!("clock skew while signing"));

    let err = client_for(&gateway)
        .do_zktls(scenario_params(), options)
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("attest failed after 3 retries"));
    assert!(message.contains("request params callback failed"));
    assert!(message.contains("clock skew while signing"));
    assert_eq!(gateway.calls().attest, 0);
}

#[tokio::test(start_paused = true)]
async fn test_verify_is_retried() {
    let gateway = Arc::new(MockGateway::new("task-p").failing_verifies(2));

    client_for(&gateway)
        .do_zktls(scenario_params(), ZktlsOptions::default())
        .await
        .unwrap();

    assert_eq!(gateway.calls().verify_and_poll, 3);
}

#[tokio::test(start_paused = true)]
async fn test_slow_attest_times_out_and_is_retried() {
    let gateway =
        Arc::new(MockGateway::new("task-t").slow_attests(1, Duration::from_secs(301)));
    let start = Instant::now();

    client_for(&gateway)
        .do_zktls(scenario_params(), ZktlsOptions::default())
        .await
        .unwrap();

    assert_eq!(gateway.calls().attest, 2);
    assert!(start.elapsed() >= Duration::from_secs(300) + Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_attest_params_carry_options() {
    let gateway = Arc::new(MockGateway::new("task-o"));
    let options = ZktlsOptions {
        algorithm_type: AlgorithmType::Proxytls,
        special_task: Some("partial-reveal".to_string()),
        no_proxy: false,
        run_zkvm: false,
        ..Default::default()
    };

    client_for(&gateway)
        .do_zktls(scenario_params(), options)
        .await
        .unwrap();

    let sent = gateway.last_attest_params().await.unwrap();
    assert_eq!(sent["address"], dvc_common::DEFAULT_ATTESTOR_ADDRESS);
    assert_eq!(sent["taskId"], "task-o");
    assert_eq!(sent["attMode"]["algorithmType"], "proxytls");
    assert_eq!(sent["specialTask"], "partial-reveal");
    assert_eq!(sent["noProxy"], false);
    assert_eq!(sent["sslCipher"], "ECDHE-RSA-AES128-GCM-SHA256");
    assert_eq!(sent["getAllJsonResponse"], "true");
    assert_eq!(sent["responseResolves"][0][0]["keyName"], "h");
}

#[tokio::test(start_paused = true)]
async fn test_independent_runs_share_one_client() {
    let gateway = Arc::new(MockGateway::new("task-j"));
    let client = client_for(&gateway);

    let (first, second) = tokio::join!(
        client.do_zktls(scenario_params(), ZktlsOptions::default()),
        client.do_zktls(scenario_params(), ZktlsOptions::default()),
    );

    assert_eq!(first.unwrap(), second.unwrap());
    assert_eq!(gateway.calls().init, 2);
    assert_eq!(gateway.calls().get_all_json_response, 2);
}

#[tokio::test(start_paused = true)]
async fn test_custom_attestor_identity() {
    let client = ZktlsClient::new(MockGateway::new("task-i"), chain()).with_attest_params(
        AttestParams {
            address: "0x0000000000000000000000000000000000000abc".to_string(),
        },
    );

    client
        .do_zktls(scenario_params(), ZktlsOptions::default())
        .await
        .unwrap();

    let sent = client.gateway().last_attest_params().await.unwrap();
    assert_eq!(sent["address"], "0x0000000000000000000000000000000000000abc");
    assert_eq!(client.gateway().calls().submit_task, 1);
}
