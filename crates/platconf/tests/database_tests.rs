//! Database and localization backends run against the in-memory SQL session.

mod common;

use common::{config, resource_dir, yaml_path, FakeConnector};
use platconf::PlatconfError;

const DATABASE_RUN: &str = r#"
application: postgres
resource: database
resourceName: appdb
endpoint: postgres://db.local:5432/postgres
authorization:
  username: admin
  password: secret
"#;

#[tokio::test]
async fn test_create_database_twice_creates_once() {
    let connector = FakeConnector::default();
    let run = config(DATABASE_RUN);

    let first = connector.reconciler().run(&run).await.unwrap();
    assert_eq!(first.created, 1);

    let second = connector.reconciler().run(&run).await.unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.unchanged, 1);

    assert_eq!(connector.database.executed(), vec!["CREATE DATABASE \"appdb\""]);
    assert_eq!(connector.database.closes(), 2);
}

#[tokio::test]
async fn test_delete_database() {
    let connector = FakeConnector::default();
    let run = config(&format!("{}mode: delete\n", DATABASE_RUN));

    let report = connector.reconciler().run(&run).await.unwrap();

    assert_eq!(report.deleted, 1);
    assert_eq!(connector.database.executed(), vec!["DROP DATABASE IF EXISTS \"appdb\""]);
}

#[tokio::test]
async fn test_create_user_with_resource_password() {
    let connector = FakeConnector::default();
    let run = config(
        r#"
application: postgres
resource: user
resourceName: app
resourcePassword: "it's"
endpoint: postgres://db.local:5432/postgres
authorization:
  username: admin
  password: secret
"#,
    );

    connector.reconciler().run(&run).await.unwrap();

    assert_eq!(
        connector.database.executed(),
        vec!["CREATE USER \"app\" WITH PASSWORD 'it''s'"]
    );
    assert_eq!(
        connector.database.state.lock().unwrap().connect_usernames,
        vec!["admin"]
    );
}

fn script_run(directory: &std::path::Path) -> String {
    format!(
        r#"
application: database
resource: scripts
endpoint: postgres://db.local:5432/app
authorization:
  username: admin
  password: secret
fileSet:
  directory: {}
  includes: ["*.sql"]
"#,
        yaml_path(directory)
    )
}

#[tokio::test]
async fn test_scripts_run_in_file_order() {
    let dir = resource_dir(&[
        ("02_data.sql", "INSERT INTO t VALUES (1);"),
        ("01_schema.sql", "CREATE TABLE IF NOT EXISTS t (id int);"),
        ("notes.txt", "not a script"),
    ]);
    let connector = FakeConnector::default();

    let report = connector
        .reconciler()
        .run(&config(&script_run(dir.path())))
        .await
        .unwrap();

    assert_eq!(report.executed, 2);
    assert_eq!(
        connector.database.executed(),
        vec![
            "CREATE TABLE IF NOT EXISTS t (id int);",
            "INSERT INTO t VALUES (1);"
        ]
    );
}

#[tokio::test]
async fn test_failed_script_is_reported_and_others_run() {
    let dir = resource_dir(&[
        ("01_broken.sql", "CREATE TABLE broken ("),
        ("02_ok.sql", "SELECT 1;"),
    ]);
    let connector = FakeConnector::default();
    connector.database.reject_statements_containing("broken");

    let err = connector
        .reconciler()
        .run(&config(&script_run(dir.path())))
        .await
        .unwrap_err();

    match err {
        PlatconfError::Items(failed) => {
            assert_eq!(failed.0.len(), 1);
            assert_eq!(failed.0[0].resource, "01_broken.sql");
            assert!(failed.0[0].message.contains("syntax error"));
        }
        other => panic!("expected item failures, got {other:?}"),
    }
    assert_eq!(connector.database.executed(), vec!["SELECT 1;"]);
    assert_eq!(connector.database.closes(), 1);
}

#[tokio::test]
async fn test_connection_loss_aborts_the_run() {
    let dir = resource_dir(&[
        ("01_first.sql", "SELECT 'lost';"),
        ("02_second.sql", "SELECT 2;"),
    ]);
    let connector = FakeConnector::default();
    connector.database.disconnect_on_statements_containing("lost");

    let err = connector
        .reconciler()
        .run(&config(&script_run(dir.path())))
        .await
        .unwrap_err();

    assert!(matches!(err, PlatconfError::Transport(_)), "got {err:?}");
    assert!(connector.database.executed().is_empty());
    assert_eq!(connector.database.closes(), 1);
}

fn label_run(directory: &std::path::Path) -> String {
    format!(
        r#"
application: i18n
resource: label
endpoint: postgres://db.local:5432/app
authorization:
  username: admin
  password: secret
fileSet:
  directory: {}
"#,
        yaml_path(directory)
    )
}

#[tokio::test]
async fn test_localization_label_is_inserted() {
    let dir = resource_dir(&[("ORDER/label_de.properties", "title=Bestellung")]);
    let connector = FakeConnector::default();

    let report = connector.reconciler().run(&config(&label_run(dir.path()))).await.unwrap();

    assert_eq!(report.created, 1);
    let executed = connector.database.executed();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].starts_with("INSERT INTO i18n"));
    assert!(executed[0].contains("'ORDER'"));
    assert!(executed[0].contains("'de'"));
    assert_eq!(connector.database.closes(), 1);
}

#[tokio::test]
async fn test_localization_label_replaces_existing_row() {
    let dir = resource_dir(&[("ORDER/label_de.properties", "title=Bestellung")]);
    let connector = FakeConnector::default();
    connector
        .database
        .state
        .lock()
        .unwrap()
        .existing
        .insert("ORDER".to_string());

    let report = connector.reconciler().run(&config(&label_run(dir.path()))).await.unwrap();

    assert_eq!(report.replaced, 1);
    let executed = connector.database.executed();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].starts_with("DELETE FROM i18n WHERE id = 'ORDER';\nINSERT INTO i18n"));
}

#[tokio::test]
async fn test_failed_replacement_never_deletes_alone() {
    let dir = resource_dir(&[("ORDER/label_de.properties", "title=Bestellung")]);
    let connector = FakeConnector::default();
    connector
        .database
        .state
        .lock()
        .unwrap()
        .existing
        .insert("ORDER".to_string());
    connector.database.reject_statements_containing("INSERT INTO i18n");

    let err = connector
        .reconciler()
        .run(&config(&label_run(dir.path())))
        .await
        .unwrap_err();

    assert!(matches!(err, PlatconfError::Items(_)), "got {err:?}");
    assert!(connector.database.executed().is_empty());
    assert_eq!(connector.database.closes(), 1);
}
