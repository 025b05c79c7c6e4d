//! Unit tests for score resolution and invite-code visibility.
//!
//! Run with `cargo test --test winner_logic`.

use chrono::Utc;
use warband_backend::common::PublicUser;
use warband_backend::routes::game::model::{
    GameMemberResponse, GameResponse, winning_user_ids,
};

fn scored(pairs: &[(&str, Option<i32>)]) -> Vec<(String, Option<i32>)> {
    pairs
        .iter()
        .map(|(id, p)| (id.to_string(), *p))
        .collect()
}

#[test]
fn highest_score_wins() {
    let winners = winning_user_ids(&scored(&[
        ("a", Some(12)),
        ("b", Some(35)),
        ("c", Some(7)),
    ]));
    assert_eq!(winners, vec!["b"]);
}

#[test]
fn tied_top_scores_all_win() {
    let winners = winning_user_ids(&scored(&[
        ("a", Some(1)),
        ("b", Some(5)),
        ("c", Some(5)),
    ]));
    assert_eq!(winners, vec!["b", "c"]);
}

#[test]
fn everyone_tied_everyone_wins() {
    let winners = winning_user_ids(&scored(&[
        ("a", Some(5)),
        ("b", Some(5)),
        ("c", Some(5)),
    ]));
    assert_eq!(winners, vec!["a", "b", "c"]);
}

#[test]
fn missing_score_counts_as_zero() {
    let winners = winning_user_ids(&scored(&[("a", None), ("b", Some(3))]));
    assert_eq!(winners, vec!["b"]);

    // All-none collapses to an all-zero tie
    let winners = winning_user_ids(&scored(&[("a", None), ("b", None)]));
    assert_eq!(winners, vec!["a", "b"]);
}

#[test]
fn no_members_no_winners() {
    assert!(winning_user_ids(&[]).is_empty());
}

fn public_user(id: &str) -> PublicUser {
    PublicUser {
        id: id.to_string(),
        username: Some(id.to_string()),
        image: None,
    }
}

fn game_with_member(member_id: &str) -> GameResponse {
    let now = Utc::now();
    GameResponse {
        id: "g1".to_string(),
        created_at: now,
        updated_at: now,
        game: "Warhammer 40k".to_string(),
        points: 2000,
        image: None,
        description: None,
        is_started: false,
        is_complete: false,
        invite_code: Some("123456".to_string()),
        created_by: public_user(member_id),
        members: vec![GameMemberResponse {
            user: public_user(member_id),
            list: None,
            points: None,
            is_winner: false,
            model_count: None,
            model_count_remaining: None,
        }],
        invites: vec![],
    }
}

#[test]
fn members_see_the_invite_code() {
    let mut game = game_with_member("alice");
    game.redact_for("alice");
    assert_eq!(game.invite_code.as_deref(), Some("123456"));
}

#[test]
fn non_members_never_see_the_invite_code() {
    let mut game = game_with_member("alice");
    game.redact_for("mallory");
    assert!(game.invite_code.is_none());
}
