// SQLite corpus store: import, filtering and ordering against a temp database.

use std::io::Write;
use std::sync::Arc;

use quill::corpus::{self, CorpusRecord, CorpusStore, Sentiment};

fn temp_store() -> (tempfile::TempDir, Arc<dyn CorpusStore>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quill.db");
    let store = corpus::initialize_sqlite(path.to_str().unwrap()).unwrap();
    (dir, store)
}

fn with_topic(text: &str, author: &str, date: &str, topic: &str) -> CorpusRecord {
    CorpusRecord {
        topic: Some(topic.to_string()),
        ..CorpusRecord::new(text, author, date)
    }
}

fn sample() -> Vec<CorpusRecord> {
    vec![
        with_topic("Healthcare reform matters", "Obama", "2012/05/01", "healthcare"),
        with_topic("The economy is roaring back", "Trump", "2018-03-02", "economy"),
        with_topic("Jobs report looks good", "Obama", "2014/08/01", "economy"),
        with_topic("Repeal and replace", "Trump", "2017/01/20", "healthcare"),
        with_topic("Undated thought", "Obama", "someday", "healthcare"),
    ]
}

#[tokio::test]
async fn init_creates_tables_idempotently() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("quill.db");
    let path = path.to_str().unwrap();

    let first = corpus::initialize_sqlite(path).unwrap();
    assert_eq!(first.table_count().await.unwrap(), 2);
    drop(first);

    let again = corpus::initialize_sqlite(path).unwrap();
    assert_eq!(again.table_count().await.unwrap(), 2);
    assert_eq!(again.record_count().await.unwrap(), 0);
}

#[tokio::test]
async fn open_requires_an_existing_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.db");
    assert!(corpus::open_sqlite(path.to_str().unwrap()).is_err());
}

#[tokio::test]
async fn insert_then_fetch_all_round_trips_fields() {
    let (_dir, store) = temp_store();
    let record = CorpusRecord {
        sentiment: Some(Sentiment::Positive),
        sentiment_confidence: Some(0.82),
        likes: Some(1200),
        retweets: Some(340),
        topic: Some("healthcare".to_string()),
        ..CorpusRecord::new("Healthcare reform matters", "Obama", "2012/05/01")
    };

    assert_eq!(store.insert_records(&[record.clone()]).await.unwrap(), 1);
    let fetched = store.fetch_corpus(None, None).await.unwrap();
    assert_eq!(fetched, vec![record]);
}

#[tokio::test]
async fn author_filter_is_case_insensitive_and_newest_first() {
    let (_dir, store) = temp_store();
    store.insert_records(&sample()).await.unwrap();

    let obama = store.fetch_corpus(Some("obama"), None).await.unwrap();
    let texts: Vec<&str> = obama.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["Jobs report looks good", "Healthcare reform matters", "Undated thought"]
    );
}

#[tokio::test]
async fn mixed_date_separators_sort_together() {
    let (_dir, store) = temp_store();
    store.insert_records(&sample()).await.unwrap();

    let trump = store.fetch_corpus(Some("Trump"), None).await.unwrap();
    assert_eq!(trump[0].date, "2018-03-02");
    assert_eq!(trump[1].date, "2017/01/20");
}

#[tokio::test]
async fn author_and_topic_filters_combine() {
    let (_dir, store) = temp_store();
    store.insert_records(&sample()).await.unwrap();

    let hits = store
        .fetch_corpus(Some("Obama"), Some("Healthcare"))
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|r| r.author == "Obama"));

    let economy = store.fetch_corpus(None, Some("economy")).await.unwrap();
    assert_eq!(economy.len(), 2);
}

#[tokio::test]
async fn unknown_author_is_an_empty_corpus() {
    let (_dir, store) = temp_store();
    store.insert_records(&sample()).await.unwrap();

    let none = store.fetch_corpus(Some("Lincoln"), None).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn author_counts_are_largest_first() {
    let (_dir, store) = temp_store();
    store.insert_records(&sample()).await.unwrap();

    let counts = store.author_counts().await.unwrap();
    assert_eq!(
        counts,
        vec![("Obama".to_string(), 3), ("Trump".to_string(), 2)]
    );
    assert_eq!(store.record_count().await.unwrap(), 5);
}

#[tokio::test]
async fn json_import_accepts_partial_records() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[
            {{"text": "Yes we can", "author": "Obama", "date": "2008/11/04",
              "sentiment": "positive", "likes": 10, "topic": "politics"}},
            {{"text": "Covfefe", "author": "Trump"}}
        ]"#
    )
    .unwrap();

    let records = corpus::load_json_file(file.path()).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].sentiment, Some(Sentiment::Positive));
    assert_eq!(records[0].likes, Some(10));
    assert_eq!(records[1].date, "");
    assert!(records[1].topic.is_none());

    let (_dir, store) = temp_store();
    assert_eq!(store.insert_records(&records).await.unwrap(), 2);
}

#[test]
fn json_import_rejects_malformed_files() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"[{{"author": "no text"}}]"#).unwrap();
    assert!(corpus::load_json_file(file.path()).is_err());
}
