//! Unit tests for feed item construction and merging.
//!
//! Run with `cargo test --test feed_logic`.

use chrono::{Duration, Utc};
use warband_backend::routes::feed::model::{
    FEED_LIMIT, FeedItemType, FriendAddedRow, FriendGameRow, GameFeedMemberRow, GroupJoinedRow,
    friend_added_items, friend_game_items, group_joined_items, merge_feed,
};

fn member(game_id: &str, user_id: &str, is_winner: bool) -> GameFeedMemberRow {
    GameFeedMemberRow {
        game_id: game_id.to_string(),
        user_id: user_id.to_string(),
        username: Some(user_id.to_string()),
        is_winner,
    }
}

fn game(game_id: &str, is_complete: bool) -> FriendGameRow {
    FriendGameRow {
        game_id: game_id.to_string(),
        game: "Warhammer 40k".to_string(),
        points: 2000,
        is_complete,
        updated_at: Utc::now(),
    }
}

#[test]
fn friend_added_title() {
    let items = friend_added_items(&[FriendAddedRow {
        friend_id: "bob".to_string(),
        created_at: Utc::now(),
        adder_username: Some("alice".to_string()),
        added_username: Some("bob".to_string()),
    }]);

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].item_type, FeedItemType::FriendAdded);
    assert_eq!(items[0].title, "@alice added @bob as a friend");
    assert!(items[0].sub_title.is_none());
}

#[test]
fn group_creator_join_reads_as_created() {
    let row = |user_id: &str| GroupJoinedRow {
        group_id: "grp".to_string(),
        created_at: Utc::now(),
        user_id: user_id.to_string(),
        username: Some(user_id.to_string()),
        group_name: "Night Lords".to_string(),
        group_image: None,
        group_created_by: "alice".to_string(),
    };

    let items = group_joined_items(&[row("alice"), row("bob")]);
    assert_eq!(items[0].item_type, FeedItemType::GroupCreated);
    assert_eq!(items[0].title, "@alice created the Night Lords group");
    assert_eq!(items[1].item_type, FeedItemType::GroupJoined);
    assert_eq!(items[1].title, "@bob joined the Night Lords group");
}

#[test]
fn game_item_names_only_friends() {
    let members = vec![
        member("g1", "alice", false),
        member("g1", "stranger", false),
        member("g1", "bob", false),
    ];
    let friends = vec!["alice".to_string(), "bob".to_string()];

    let items = friend_game_items(&[game("g1", false)], &members, &friends);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].item_type, FeedItemType::GameStarted);
    assert_eq!(
        items[0].title,
        "@alice & bob started a Warhammer 40k of 2000pts"
    );
    assert!(items[0].sub_title.is_none());
}

#[test]
fn completed_game_lists_winners() {
    let members = vec![member("g1", "alice", true), member("g1", "bob", false)];
    let friends = vec!["alice".to_string(), "bob".to_string()];

    let items = friend_game_items(&[game("g1", true)], &members, &friends);
    assert_eq!(items[0].item_type, FeedItemType::GameCompleted);
    assert_eq!(items[0].sub_title.as_deref(), Some("Winner: @alice"));

    let members = vec![member("g1", "alice", true), member("g1", "bob", true)];
    let items = friend_game_items(&[game("g1", true)], &members, &friends);
    assert_eq!(items[0].sub_title.as_deref(), Some("Winners: @alice, @bob"));
}

#[test]
fn games_shared_by_multiple_friends_appear_once() {
    let members = vec![member("g1", "alice", false), member("g1", "bob", false)];
    let friends = vec!["alice".to_string(), "bob".to_string()];

    // The same game surfaces via both friends' memberships
    let items = friend_game_items(&[game("g1", false), game("g1", false)], &members, &friends);
    assert_eq!(items.len(), 1);
}

#[test]
fn merge_orders_newest_first_and_caps() {
    let now = Utc::now();
    let items: Vec<_> = (0..30)
        .map(|i| {
            friend_added_items(&[FriendAddedRow {
                friend_id: format!("f{i}"),
                created_at: now - Duration::minutes(i),
                adder_username: Some("a".to_string()),
                added_username: Some("b".to_string()),
            }])
            .remove(0)
        })
        .collect();

    // Feed the merge out of order
    let mut shuffled = items.clone();
    shuffled.reverse();

    let merged = merge_feed(shuffled);
    assert_eq!(merged.len(), FEED_LIMIT);
    for pair in merged.windows(2) {
        assert!(pair[0].date >= pair[1].date);
    }
    assert_eq!(merged[0].id, "f0");
}
