mod common;

use std::sync::Arc;

use common::*;
use raffle_engine::admin::RaffleAdmin;
use raffle_engine::catalog::RaffleCatalog;
use raffle_engine::clock::Clock;
use raffle_engine::config::Config;
use raffle_engine::entropy::{RandomSource, SeededEntropy};
use raffle_engine::ledger::EntryLedger;
use raffle_engine::memory_store::MemoryStore;
use raffle_engine::payment::UnverifiedPayments;
use raffle_engine::selector::WinnerSelector;
use raffle_engine::session::{RequestContext, WalletSession};
use raffle_engine::state::RaffleStatus;
use raffle_engine::Processor;
use serde_json::{json, Value};

struct Boundary {
    processor: Processor<MemoryStore, UnverifiedPayments>,
    clock: Arc<raffle_engine::clock::FixedClock>,
}

// Setup processor over a fresh store with a fixed clock and seeded draws
async fn setup_processor() -> Boundary {
    let config = Config::default();
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(raffle_engine::clock::FixedClock::new(NOW));
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    let random: Arc<dyn RandomSource> = Arc::new(SeededEntropy::new(3));
    let processor = Processor::from_parts(
        EntryLedger::new(store.clone(), &config, dyn_clock.clone(), UnverifiedPayments),
        WinnerSelector::new(store.clone(), &config, dyn_clock.clone(), random),
        RaffleCatalog::new(store.clone(), dyn_clock.clone()),
        RaffleAdmin::new(store, dyn_clock),
    );
    Boundary { processor, clock }
}

async fn call(b: &Boundary, request: Value) -> Result<Value, Value> {
    let ctx = RequestContext::anonymous();
    b.processor
        .process_json(&ctx, &request.to_string())
        .await
        .map_err(|e| serde_json::to_value(e).unwrap())
}

async fn create_live(b: &Boundary, max_tickets: u64) -> String {
    let raffle = call(
        b,
        json!({
            "action": "create_raffle",
            "title": "Boundary raffle",
            "prizeAmount": 2.0,
            "ticketPrice": 0.05,
            "maxTickets": max_tickets,
            "receivingAddress": "0xReceiver",
            "status": "live",
            "endsAt": "2023-11-14T23:13:20Z",
        }),
    )
    .await
    .unwrap();
    assert_eq!(raffle["prizeSymbol"], "ETH");
    raffle["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_record_entry_over_json() {
    let b = setup_processor().await;
    let raffle_id = create_live(&b, 10).await;

    let response = call(
        &b,
        json!({
            "action": "record_entry",
            "raffleId": raffle_id,
            "walletAddress": "0xA",
            "txHash": "0xT1",
        }),
    )
    .await
    .unwrap();
    assert_eq!(response["duplicate"], false);
    assert_eq!(response["entry"]["quantity"], 1);
    assert_eq!(response["entry"]["txHash"], "0xT1");
    assert!(response["entry"].get("email").is_none());

    let err = call(
        &b,
        json!({
            "action": "record_entry",
            "raffleId": raffle_id,
            "walletAddress": "0xB",
            "txHash": "0xT2",
            "quantity": 10,
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err["kind"], "capacity");
    assert_eq!(err["message"], "Not enough tickets available, 9 tickets left");
}

#[tokio::test]
async fn test_user_and_entry_lookup_over_json() {
    let b = setup_processor().await;
    let raffle_id = create_live(&b, 10).await;

    let user = call(&b, json!({ "action": "get_or_create_user", "walletAddress": "0xA" }))
        .await
        .unwrap();
    let user_id = user["userId"].as_str().unwrap().to_string();

    let none = call(
        &b,
        json!({ "action": "check_entry", "raffleId": raffle_id, "userId": user_id }),
    )
    .await
    .unwrap();
    assert!(none.is_null());

    call(
        &b,
        json!({
            "action": "record_entry",
            "raffleId": raffle_id,
            "walletAddress": "0xA",
            "txHash": "0xT1",
            "quantity": 2,
        }),
    )
    .await
    .unwrap();
    let entry = call(
        &b,
        json!({ "action": "check_entry", "raffleId": raffle_id, "userId": user_id }),
    )
    .await
    .unwrap();
    assert_eq!(entry["userId"], user_id.as_str());
    assert_eq!(entry["quantity"], 2);

    let err = call(&b, json!({ "action": "get_or_create_user" })).await.unwrap_err();
    assert_eq!(err["kind"], "validation");
}

#[tokio::test]
async fn test_draw_and_sweep_over_json() {
    let b = setup_processor().await;
    let raffle_id = create_live(&b, 10).await;
    let empty_id = create_live(&b, 10).await;
    call(
        &b,
        json!({
            "action": "record_entry",
            "raffleId": raffle_id,
            "walletAddress": "0xA",
            "txHash": "0xT1",
        }),
    )
    .await
    .unwrap();

    let err = call(&b, json!({ "action": "draw_winner", "raffleId": raffle_id }))
        .await
        .unwrap_err();
    assert_eq!(err["kind"], "not_ended");

    b.clock.advance(HOUR);
    let winner = call(&b, json!({ "action": "draw_winner", "raffleId": raffle_id }))
        .await
        .unwrap();
    assert_eq!(winner["walletAddress"], "0xA");
    assert!(winner["winnerUserId"].is_string());
    assert!(winner["drawnAt"].is_string());

    let err = call(&b, json!({ "action": "draw_winner", "raffleId": raffle_id }))
        .await
        .unwrap_err();
    assert_eq!(err["kind"], "already_drawn");
    assert_eq!(err["winner"]["walletAddress"], "0xA");

    let report = call(&b, json!({ "action": "sweep_ended_raffles" })).await.unwrap();
    assert_eq!(report["drawnCount"], 0);
    assert_eq!(report["completedWithoutWinner"], json!([empty_id]));
    assert_eq!(report["failures"], json!([]));
}

#[tokio::test]
async fn test_raffle_projection_follows_session() {
    let b = setup_processor().await;
    let raffle_id = create_live(&b, 10).await;
    let request = json!({ "action": "get_raffle", "raffleId": raffle_id }).to_string();

    let public = b
        .processor
        .process_json(&RequestContext::anonymous(), &request)
        .await
        .unwrap();
    assert!(public.get("receivingAddress").is_none());
    assert_eq!(public["ticketsLeft"], 10);
    assert_eq!(public["status"], "live");

    let mut session = WalletSession::connect("0xPayer", Some(1), NOW).unwrap();
    let payment = b
        .processor
        .process_json(&RequestContext::with_session(&session), &request)
        .await
        .unwrap();
    assert_eq!(payment["receivingAddress"], "0xReceiver");
    assert_eq!(payment["ticketsSold"], 0);

    session.disconnect();
    let after = b
        .processor
        .process_json(&RequestContext::with_session(&session), &request)
        .await
        .unwrap();
    assert!(after.get("receivingAddress").is_none());
}

#[tokio::test]
async fn test_admin_actions_over_json() {
    let b = setup_processor().await;
    let draft = call(
        &b,
        json!({
            "action": "create_raffle",
            "title": "Draft raffle",
            "prizeAmount": 1.0,
            "ticketPrice": 0.01,
            "maxTickets": 5,
            "receivingAddress": "0xReceiver",
            "endsAt": "2023-11-15T00:00:00Z",
        }),
    )
    .await
    .unwrap();
    assert_eq!(draft["status"], RaffleStatus::Draft.as_str());
    let raffle_id = draft["id"].as_str().unwrap().to_string();

    let live = call(&b, json!({ "action": "publish_raffle", "raffleId": raffle_id }))
        .await
        .unwrap();
    assert_eq!(live["status"], "live");

    let closed = call(&b, json!({ "action": "close_raffle", "raffleId": raffle_id }))
        .await
        .unwrap();
    assert_eq!(closed["status"], "closed");

    let err = call(&b, json!({ "action": "publish_raffle", "raffleId": raffle_id }))
        .await
        .unwrap_err();
    assert_eq!(err["kind"], "invalid_transition");
}

#[tokio::test]
async fn test_malformed_requests_are_validation_errors() {
    let b = setup_processor().await;
    let ctx = RequestContext::anonymous();

    for input in [
        "not json",
        r#"{"action":"refund"}"#,
        r#"{"action":"draw_winner","raffleId":"not-a-uuid"}"#,
    ] {
        let err = b.processor.process_json(&ctx, input).await.unwrap_err();
        assert_eq!(err.kind, "validation");
        assert_eq!(err.status, 400);
    }

    let err = call(
        &b,
        json!({ "action": "get_raffle", "raffleId": "00000000-0000-4000-8000-000000000000" }),
    )
    .await
    .unwrap_err();
    assert_eq!(err["kind"], "not_found");
}

#[tokio::test]
async fn test_listings_over_json() {
    let b = setup_processor().await;
    let raffle_id = create_live(&b, 10).await;
    b.clock.advance(60);
    let newer_id = create_live(&b, 10).await;
    call(
        &b,
        json!({
            "action": "record_entry",
            "raffleId": raffle_id,
            "walletAddress": "0xA",
            "txHash": "0xT1",
            "quantity": 2,
        }),
    )
    .await
    .unwrap();

    let live = call(&b, json!({ "action": "list_live_raffles" })).await.unwrap();
    assert_eq!(live[0]["id"], newer_id.as_str());
    assert_eq!(live[1]["id"], raffle_id.as_str());
    assert_eq!(live[1]["ticketsSold"], 2);
    assert!(live[1].get("receivingAddress").is_none());

    let entries = call(&b, json!({ "action": "list_wallet_entries", "walletAddress": " 0xA " }))
        .await
        .unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["quantity"], 2);
    assert_eq!(entries[0]["txHash"], "0xT1");
    assert_eq!(entries[0]["raffle"]["title"], "Boundary raffle");
    assert_eq!(entries[0]["raffle"]["status"], "live");

    let none = call(&b, json!({ "action": "list_wallet_entries", "walletAddress": "0xNobody" }))
        .await
        .unwrap();
    assert_eq!(none, json!([]));
    let err = call(&b, json!({ "action": "list_wallet_entries" })).await.unwrap_err();
    assert_eq!(err["kind"], "validation");

    assert_eq!(call(&b, json!({ "action": "list_ended_raffles" })).await.unwrap(), json!([]));

    b.clock.advance(2 * HOUR);
    call(&b, json!({ "action": "sweep_ended_raffles" })).await.unwrap();

    let ended = call(&b, json!({ "action": "list_ended_raffles" })).await.unwrap();
    assert_eq!(ended.as_array().unwrap().len(), 2);
    assert!(ended.as_array().unwrap().iter().all(|r| r["status"] == "completed"));

    let winners = call(&b, json!({ "action": "list_winners" })).await.unwrap();
    assert_eq!(winners.as_array().unwrap().len(), 1);
    assert_eq!(winners[0]["raffleId"], raffle_id.as_str());
    assert_eq!(winners[0]["winnerWallet"], "0xA");
    assert_eq!(winners[0]["prizeSymbol"], "ETH");
    assert!(winners[0]["drawnAt"].is_string());
}
