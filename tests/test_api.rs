use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

use reel_tuner::api::*;
use reel_tuner::error::SlotError;
use reel_tuner::simulator::simulate_seeded;

const UNIFORM: &str = r#"{"reel_1": [2, 2, 2], "reel_2": [2, 2, 2], "reel_3": [2, 2, 2]}"#;

fn rng() -> StdRng {
    StdRng::seed_from_u64(17)
}

#[test]
fn test_search_request_defaults() {
    let req: SearchRequest = parse_request("{}").unwrap();
    assert_eq!(req, SearchRequest::default());
    assert_eq!(req.steps, 800);
    assert_eq!(req.eval_spins, 50_000);
    assert_eq!(req.spins, 100_000);
    assert_eq!(req.seed, Some(42));
}

#[test]
fn test_search_request_alias() {
    let req: SearchRequest = parse_request(r#"{"validation_spins": 500, "steps": 3}"#).unwrap();
    assert_eq!(req.spins, 500);
    assert_eq!(req.steps, 3);
    let cfg = req.to_config();
    assert_eq!(cfg.steps, 3);
    assert_eq!(cfg.seed, Some(42));
}

#[test]
fn test_search_request_rejects_zero_counts() {
    for body in [r#"{"steps": 0}"#, r#"{"eval_spins": 0}"#, r#"{"spins": 0}"#] {
        let req: SearchRequest = parse_request(body).unwrap();
        assert!(matches!(search(&req), Err(SlotError::InvalidRequest(_))), "{}", body);
    }
}

#[test]
fn test_malformed_body_is_client_error() {
    let err = parse_request::<SearchRequest>("{not json").unwrap_err();
    assert!(matches!(err, SlotError::InvalidRequest(_)));
    let err = parse_request::<SearchRequest>(r#"{"steps": -1}"#).unwrap_err();
    assert!(err.is_client_error());
}

#[test]
fn test_spin_request_default_bet() {
    let req: SpinRequest = parse_request(&format!(r#"{{"reels": {}}}"#, UNIFORM)).unwrap();
    assert_eq!(req.bet_amount, 1.0);
    let resp = spin(&req, &mut rng()).unwrap();
    assert_eq!(resp.matches.len(), 5);
    assert_relative_eq!(resp.payout, 9.0);
    assert_eq!(resp.grid, [[2; 3]; 3]);
}

#[test]
fn test_spin_request_invalid_reels() {
    let short = r#"{"reels": {"reel_1": [2, 2], "reel_2": [2, 2, 2], "reel_3": [2, 2, 2]}}"#;
    assert!(parse_request::<SpinRequest>(short).unwrap_err().is_client_error());
    let unknown = r#"{"reels": {"reel_1": [2, 2, 8], "reel_2": [2, 2, 2], "reel_3": [2, 2, 2]}}"#;
    assert!(parse_request::<SpinRequest>(unknown).unwrap_err().is_client_error());
}

#[test]
fn test_simulate_request() {
    let req: SimulateRequest = parse_request(&format!(r#"{{"reels": {}}}"#, UNIFORM)).unwrap();
    assert_eq!(req.spins, 10_000);
    assert_eq!(req.seed, Some(42));
    let m = simulate(&req).unwrap();
    assert_eq!(m.spins, 10_000);
    assert_relative_eq!(m.rtp, 9.0);
    assert_eq!(m.win_rate, 1.0);
}

#[test]
fn test_simulate_request_matches_seeded_simulator() {
    let body = r#"{"reels": {"reel_1": [0, 0, 1, 1, 2, 2, 3, 0], "reel_2": [0, 0, 1, 1, 0, 0, 2, 2], "reel_3": [1, 1, 0, 0, 0, 2, 2, 1]}, "spins": 20000, "seed": 42}"#;
    let req: SimulateRequest = parse_request(body).unwrap();
    let via_request = simulate(&req).unwrap();
    let direct = simulate_seeded(&req.reels, 20_000, 1.0, 42).unwrap();
    assert_eq!(via_request, direct);
}

#[test]
fn test_simulate_request_zero_spins() {
    let req: SimulateRequest =
        parse_request(&format!(r#"{{"reels": {}, "spins": 0}}"#, UNIFORM)).unwrap();
    assert!(matches!(simulate(&req), Err(SlotError::InvalidRequest(_))));
}

#[test]
fn test_error_classification() {
    let client = ErrorBody::from(&SlotError::InvalidRequest("bad".to_string()));
    assert_eq!(client.kind, ErrorKind::InvalidRequest);
    assert!(client.message.contains("bad"));

    let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
    let engine = ErrorBody::from(&SlotError::Io(io));
    assert_eq!(engine.kind, ErrorKind::EngineError);

    let value = serde_json::to_value(&engine).unwrap();
    assert_eq!(value["kind"], json!("engine_error"));
}

#[test]
fn test_handle_json_simulate() {
    let body = format!(r#"{{"reels": {}, "spins": 100}}"#, UNIFORM);
    let value = handle_json(Operation::Simulate, &body, &mut rng()).unwrap();
    assert_eq!(value["spins"], json!(100));
    assert_eq!(value["rtp"], json!(9.0));
    assert_eq!(value["win_rate"], json!(1.0));
}

#[test]
fn test_handle_json_spin() {
    let body = format!(r#"{{"reels": {}, "bet_amount": 2.0}}"#, UNIFORM);
    let value = handle_json(Operation::Spin, &body, &mut rng()).unwrap();
    assert_eq!(value["payout"], json!(18.0));
    assert_eq!(value["matches"].as_array().map(|m| m.len()), Some(5));
    assert_eq!(value["matches"][4]["pattern"], json!("full_3x3"));
}

#[test]
fn test_handle_json_errors() {
    let neg = format!(r#"{{"reels": {}, "bet_amount": -1.0}}"#, UNIFORM);
    let err = handle_json(Operation::Spin, &neg, &mut rng()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidRequest);

    let err = handle_json(Operation::Search, r#"{"steps": 0}"#, &mut rng()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidRequest);

    let err = handle_json(Operation::Simulate, "[]", &mut rng()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidRequest);
}

#[test]
fn test_handle_json_search() {
    let body = r#"{"steps": 3, "eval_spins": 500, "seed": 5}"#;
    let value = handle_json(Operation::Search, body, &mut rng()).unwrap();
    assert!(value["reels"]["reel_1"].is_array());
    assert!(value["reels"]["reel_3"].is_array());
    assert!(value["validation"]["rtp"].is_number());
    assert!(value["validation"]["win_rate"].is_number());
}
