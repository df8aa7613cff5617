use homeroom::models::{NewMessage, Role};
use homeroom::poller::{ThreadPoller, MIN_INTERVAL};
use homeroom::repo::MessageRepo;
use homeroom::LocalRepo;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

async fn seed(repo: &LocalRepo, thread_id: &str, text: &str) {
    repo.send_message(NewMessage {
        thread_id: thread_id.into(),
        from_role: Role::Teacher,
        sender_id: "t-1".into(),
        content: text.into(),
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn polls_until_rearmed_or_stopped() {
    let repo = Arc::new(LocalRepo::in_memory());
    seed(&repo, "th-a", "hello a").await;
    seed(&repo, "th-b", "hello b").await;

    let mut poller = ThreadPoller::new(Arc::clone(&repo), Duration::from_millis(20));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let tx_a = tx.clone();
    poller.watch("th-a", move |msgs| {
        let _ = tx_a.send(msgs);
    });
    let first = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    assert_eq!(first[0].content, "hello a");
    assert!(poller.is_watching());

    // new messages show up on a later tick
    seed(&repo, "th-a", "second").await;
    let mut latest = first;
    while latest.len() < 2 {
        latest = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    }
    assert_eq!(latest[1].content, "second");

    // re-arming switches threads
    let tx_b = tx.clone();
    poller.watch("th-b", move |msgs| {
        let _ = tx_b.send(msgs);
    });
    drop(tx);
    loop {
        let msgs = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        if msgs.iter().all(|m| m.thread_id == "th-b") {
            break;
        }
    }

    poller.stop();
    assert!(!poller.is_watching());
    // every sender was owned by an aborted task, so the channel closes
    let closed = tokio::time::timeout(Duration::from_secs(2), async {
        while rx.recv().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok());
}

#[tokio::test]
async fn zero_interval_is_raised_to_minimum() {
    let repo = Arc::new(LocalRepo::in_memory());
    seed(&repo, "th-z", "tick").await;

    let mut poller = ThreadPoller::new(Arc::clone(&repo), Duration::ZERO);
    assert_eq!(poller.interval(), MIN_INTERVAL);

    let (tx, mut rx) = mpsc::unbounded_channel();
    poller.watch("th-z", move |msgs| {
        let _ = tx.send(msgs);
    });
    for _ in 0..2 {
        let msgs = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert_eq!(msgs[0].content, "tick");
    }
    assert!(poller.is_watching());
}
