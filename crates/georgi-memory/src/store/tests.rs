use super::*;
use chrono::TimeZone;
use georgi_core::message::IncomingMessage;
use uuid::Uuid;

const WINDOW: Duration = Duration::from_secs(30 * 60);

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn minutes(m: i64) -> chrono::Duration {
    chrono::Duration::minutes(m)
}

fn key(k: &str) -> ConversantKey {
    ConversantKey::new(k)
}

fn message(sender: &str, channel_id: Option<&str>) -> IncomingMessage {
    IncomingMessage {
        id: Uuid::nil(),
        message_id: "1".into(),
        channel: "discord".into(),
        sender_id: sender.into(),
        sender_name: None,
        sender_username: sender.into(),
        is_bot: false,
        text: "hi".into(),
        timestamp: t0(),
        reply_to: None,
        reply_target: channel_id.map(String::from),
        guild_id: None,
    }
}

#[test]
fn test_put_then_get_returns_latest_state() {
    let store = ContextStore::new(WINDOW);
    store.put_at(key("u1"), vec![1, 2, 3], t0());
    store.put_at(key("u1"), vec![9], t0() + minutes(1));

    let record = store.get(&key("u1")).unwrap();
    assert_eq!(record.state, vec![9]);
    assert_eq!(record.last_active, t0() + minutes(1));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_load_within_window_returns_state() {
    let store = ContextStore::new(WINDOW);
    store.put_at(key("u1"), vec![1, 2, 3], t0());
    assert_eq!(store.load(&key("u1"), t0() + minutes(10)), Some(vec![1, 2, 3]));
    assert_eq!(store.load(&key("u1"), t0() + minutes(30)), Some(vec![1, 2, 3]));
}

#[test]
fn test_load_beyond_window_evicts() {
    let store = ContextStore::new(WINDOW);
    store.put_at(key("u1"), vec![1, 2, 3], t0());
    assert_eq!(store.load(&key("u1"), t0() + minutes(31)), None);
    assert!(store.get(&key("u1")).is_none());
    assert!(store.is_empty());
}

#[test]
fn test_load_missing_key() {
    let store = ContextStore::new(WINDOW);
    assert_eq!(store.load(&key("nobody"), t0()), None);
}

#[test]
fn test_evict_if_stale() {
    let store = ContextStore::new(WINDOW);
    store.put_at(key("u1"), vec![1], t0());

    assert!(!store.evict_if_stale(&key("u1"), t0() + minutes(5), WINDOW));
    assert!(store.get(&key("u1")).is_some());

    assert!(store.evict_if_stale(&key("u1"), t0() + minutes(45), WINDOW));
    assert!(store.get(&key("u1")).is_none());
}

#[test]
fn test_evict_absent_key_is_noop() {
    let store = ContextStore::new(WINDOW);
    assert!(!store.evict_if_stale(&key("ghost"), t0(), WINDOW));
    assert!(!store.evict_if_stale(&key("ghost"), t0(), WINDOW));
    assert!(store.is_empty());
}

#[test]
fn test_evict_only_touches_its_key() {
    let store = ContextStore::new(WINDOW);
    store.put_at(key("old"), vec![1], t0());
    store.put_at(key("new"), vec![2], t0() + minutes(40));

    assert!(store.evict_if_stale(&key("old"), t0() + minutes(45), WINDOW));
    assert_eq!(store.get(&key("new")).unwrap().state, vec![2]);
}

#[test]
fn test_future_last_active_is_fresh() {
    let record = ContextRecord {
        state: vec![1],
        last_active: t0() + minutes(5),
    };
    assert!(!record.is_stale(t0(), WINDOW));
}

#[test]
fn test_remove() {
    let store = ContextStore::new(WINDOW);
    store.put(key("u1"), vec![1]);
    assert!(store.remove(&key("u1")));
    assert!(!store.remove(&key("u1")));
}

#[test]
fn test_clones_share_records() {
    let store = ContextStore::new(WINDOW);
    let other = store.clone();
    store.put(key("u1"), vec![7]);
    assert_eq!(other.get(&key("u1")).unwrap().state, vec![7]);
}

#[test]
fn test_key_policies() {
    let msg = message("42", Some("chan-9"));
    assert_eq!(
        ConversantKey::for_message(ContextKeyPolicy::User, &msg).as_str(),
        "discord:user:42"
    );
    assert_eq!(
        ConversantKey::for_message(ContextKeyPolicy::Channel, &msg).as_str(),
        "discord:channel:chan-9"
    );

    let dm = message("42", None);
    assert_eq!(
        ConversantKey::for_message(ContextKeyPolicy::Channel, &dm).as_str(),
        "discord:channel:42"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_puts_keep_keys_separate() {
    let store = ContextStore::new(WINDOW);
    let mut handles = Vec::new();

    for name in ["a", "b"] {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..500i64 {
                store.put(key(name), vec![i, i]);
                let seen = store.load(&key(name), Utc::now()).unwrap();
                assert_eq!(seen[0], seen[1], "torn state for {name}");
                tokio::task::yield_now().await;
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    assert_eq!(store.get(&key("a")).unwrap().state, vec![499, 499]);
    assert_eq!(store.get(&key("b")).unwrap().state, vec![499, 499]);
}

#[test]
fn test_fresh_load_shares_the_lock() {
    let store = ContextStore::new(WINDOW);
    store.put_at(key("u1"), vec![1, 2], t0());

    // An upgradable reader excludes other upgradable readers, not plain ones.
    let _held = store.records.upgradable_read();
    assert_eq!(store.load(&key("u1"), t0() + minutes(5)), Some(vec![1, 2]));
    assert_eq!(store.load(&key("nobody"), t0()), None);
    assert!(!store.evict_if_stale(&key("u1"), t0() + minutes(5), WINDOW));
}

#[test]
fn test_concurrent_loads_from_threads() {
    let store = ContextStore::new(WINDOW);
    for i in 0..8 {
        store.put_at(key(&format!("u{i}")), vec![i], t0());
    }

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            std::thread::spawn(move || {
                (0..1000).all(|_| {
                    store.load(&key(&format!("u{i}")), t0() + minutes(1)) == Some(vec![i])
                })
            })
        })
        .collect();
    for h in handles {
        assert!(h.join().unwrap());
    }
}
