use incinerator_chain::mock::MockWalletSigner;
use incinerator_chain::{
    AccountMeta, ChainConfig, ChainError, ChainGateway, Instruction, Pubkey, SolanaGateway,
};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

const BLOCKHASH: &str = "11111111111111111111111111111111";

fn test_config(server: &ServerGuard) -> ChainConfig {
    ChainConfig {
        rpc_url: server.url(),
        indexer_url: server.url(),
        api_key: "gateway-key".to_string(),
        request_timeout_seconds: 5,
        confirmation_timeout_seconds: 1,
        poll_interval_ms: 20,
        ..ChainConfig::default()
    }
}

async fn mock_rpc(server: &mut ServerGuard, method: &str, result: Value) -> Mock {
    server
        .mock("POST", "/")
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({ "method": method })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string())
        .create_async()
        .await
}

async fn mock_blockhash(server: &mut ServerGuard) -> Mock {
    mock_rpc(
        server,
        "getLatestBlockhash",
        json!({
            "context": { "slot": 1 },
            "value": { "blockhash": BLOCKHASH, "lastValidBlockHeight": 150 }
        }),
    )
    .await
}

fn memo_instruction(payer: &Pubkey) -> Instruction {
    Instruction::new_with_bytes(Pubkey::new_unique(), b"burn", vec![AccountMeta::new(*payer, true)])
}

#[test_log::test(tokio::test)]
async fn test_submit_and_confirm_waits_for_confirmed_status() {
    let mut server = Server::new_async().await;
    let blockhash = mock_blockhash(&mut server).await;
    let status = mock_rpc(
        &mut server,
        "getSignatureStatuses",
        json!({
            "context": { "slot": 5 },
            "value": [{
                "slot": 4,
                "confirmations": 1,
                "err": null,
                "confirmationStatus": "confirmed"
            }]
        }),
    )
    .await;

    let gateway = SolanaGateway::new(&test_config(&server)).unwrap();
    let signer = MockWalletSigner::new_unique();
    let payer = signer.pubkey();

    let signature = gateway
        .submit_and_confirm(&[memo_instruction(&payer)], &signer)
        .await
        .unwrap();

    assert_ne!(signature, Default::default());
    assert_eq!(signer.sent_count(), 1);
    blockhash.assert_async().await;
    status.assert_async().await;
}

#[tokio::test]
async fn test_chain_failure_is_submission_error() {
    let mut server = Server::new_async().await;
    let _blockhash = mock_blockhash(&mut server).await;
    let _status = mock_rpc(
        &mut server,
        "getSignatureStatuses",
        json!({ "context": { "slot": 5 }, "value": [{
            "slot": 4, "confirmations": 0,
            "err": { "InstructionError": [0, { "Custom": 1 }] },
            "confirmationStatus": "processed"
        }] }),
    )
    .await;

    let gateway = SolanaGateway::new(&test_config(&server)).unwrap();
    let signer = MockWalletSigner::new_unique();
    let payer = signer.pubkey();

    let err = gateway
        .submit_and_confirm(&[memo_instruction(&payer)], &signer)
        .await
        .unwrap_err();

    assert!(matches!(err, ChainError::Submission(_)), "unexpected error: {:?}", err);
    assert!(err.to_string().contains("InstructionError"));
}

#[tokio::test]
async fn test_unseen_signature_times_out() {
    let mut server = Server::new_async().await;
    let _blockhash = mock_blockhash(&mut server).await;
    let _status = mock_rpc(
        &mut server,
        "getSignatureStatuses",
        json!({ "context": { "slot": 5 }, "value": [null] }),
    )
    .await;

    let gateway = SolanaGateway::new(&test_config(&server)).unwrap();
    let signer = MockWalletSigner::new_unique();
    let payer = signer.pubkey();

    let err = gateway
        .submit_and_confirm(&[memo_instruction(&payer)], &signer)
        .await
        .unwrap_err();

    assert!(matches!(err, ChainError::ConfirmationTimeout(_)), "unexpected error: {:?}", err);
}

#[tokio::test]
async fn test_rejected_by_wallet_is_submission_error() {
    let mut server = Server::new_async().await;
    let _blockhash = mock_blockhash(&mut server).await;
    let status = server
        .mock("POST", "/")
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({ "method": "getSignatureStatuses" })))
        .expect(0)
        .create_async()
        .await;

    let gateway = SolanaGateway::new(&test_config(&server)).unwrap();
    let signer = MockWalletSigner::new_unique().rejecting("User rejected the request.");
    let payer = signer.pubkey();

    let err = gateway
        .submit_and_confirm(&[memo_instruction(&payer)], &signer)
        .await
        .unwrap_err();

    assert!(matches!(err, ChainError::Submission(_)));
    assert!(err.to_string().contains("rejected"));
    status.assert_async().await;
}

#[tokio::test]
async fn test_disconnected_wallet_makes_no_rpc_calls() {
    let mut server = Server::new_async().await;
    let any_rpc = server
        .mock("POST", "/")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let gateway = SolanaGateway::new(&test_config(&server)).unwrap();
    let signer = MockWalletSigner::new_unique();
    let payer = signer.pubkey();
    signer.disconnect();

    let err = gateway
        .submit_and_confirm(&[memo_instruction(&payer)], &signer)
        .await
        .unwrap_err();

    assert!(matches!(err, ChainError::Submission(_)));
    any_rpc.assert_async().await;
}
