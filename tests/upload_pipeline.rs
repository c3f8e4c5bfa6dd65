//! Upload procedure tests with mocked warehouse collaborators.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;

use snowload::config::Settings;
use snowload::contract::{
    BulkLoadOutcome, MockWarehouseConnector, MockWarehouseSession, WarehouseError,
};
use snowload::upload::{run_upload, UploadResult};

fn settings_for(csv_path: &Path) -> Settings {
    Settings {
        csv_path: csv_path.to_path_buf(),
        account: "testacct".to_string(),
        user: "tester".to_string(),
        password: "secret".to_string(),
        warehouse: "COMPUTE_WH".to_string(),
        database: "ANALYTICS".to_string(),
        schema: "PUBLIC".to_string(),
        table: "ORDERS".to_string(),
    }
}

fn write_csv(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents).expect("write csv");
    file
}

fn error_message(result: &UploadResult) -> &str {
    match result {
        UploadResult::Error { message } => message,
        other => panic!("expected error result, got: {other:?}"),
    }
}

#[tokio::test]
async fn successful_upload_reports_both_counts() {
    let csv = write_csv(b"id,Name,Value\n1,widget,9.5\n2,gadget,3.0\n3,sprocket,1.0\n");
    let settings = settings_for(csv.path());

    // Table previously held 10 rows; uploading 3 makes 13.
    let mut connector = MockWarehouseConnector::new();
    connector.expect_connect().times(1).returning(|| {
        let mut session = MockWarehouseSession::new();
        session
            .expect_bulk_insert()
            .withf(|table, dataset| table == "ORDERS" && dataset.row_count() == 3)
            .times(1)
            .returning(|_, dataset| {
                Ok(BulkLoadOutcome {
                    success: true,
                    rows_loaded: dataset.row_count(),
                })
            });
        session
            .expect_count_rows()
            .withf(|table| table == "ORDERS")
            .times(1)
            .returning(|_| Ok(13));
        session.expect_close().times(1).returning(|| ());
        Ok(Box::new(session))
    });

    let result = run_upload(&settings, &connector).await;
    assert_eq!(
        result,
        UploadResult::Success {
            rows_uploaded: 3,
            total_rows_in_table: 13,
        }
    );
}

#[tokio::test]
async fn column_names_are_upper_cased_before_transmission() {
    let csv = write_csv(b"id,Name,Value\n1,widget,9.5\n");
    let settings = settings_for(csv.path());

    let mut connector = MockWarehouseConnector::new();
    connector.expect_connect().times(1).returning(|| {
        let mut session = MockWarehouseSession::new();
        session
            .expect_bulk_insert()
            .withf(|_, dataset| dataset.columns == ["ID", "NAME", "VALUE"])
            .times(1)
            .returning(|_, dataset| {
                Ok(BulkLoadOutcome {
                    success: true,
                    rows_loaded: dataset.row_count(),
                })
            });
        session.expect_count_rows().returning(|_| Ok(1));
        session.expect_close().times(1).returning(|| ());
        Ok(Box::new(session))
    });

    let result = run_upload(&settings, &connector).await;
    assert!(!result.is_error(), "expected success, got: {result:?}");
}

#[tokio::test]
async fn empty_csv_still_uploads_and_verifies() {
    let csv = write_csv(b"id,name\n");
    let settings = settings_for(csv.path());

    let mut connector = MockWarehouseConnector::new();
    connector.expect_connect().times(1).returning(|| {
        let mut session = MockWarehouseSession::new();
        session
            .expect_bulk_insert()
            .withf(|_, dataset| dataset.is_empty())
            .times(1)
            .returning(|_, _| {
                Ok(BulkLoadOutcome {
                    success: true,
                    rows_loaded: 0,
                })
            });
        // Only pre-existing rows in the table.
        session.expect_count_rows().times(1).returning(|_| Ok(5));
        session.expect_close().times(1).returning(|| ());
        Ok(Box::new(session))
    });

    let result = run_upload(&settings, &connector).await;
    assert_eq!(
        result,
        UploadResult::Success {
            rows_uploaded: 0,
            total_rows_in_table: 5,
        }
    );
}

#[tokio::test]
async fn unreadable_csv_reports_error_and_keeps_serving() {
    // Invalid UTF-8: the parse stage fails before any connection is made.
    let csv = write_csv(&[0xff, 0xfe, 0x00, 0x41, 0x2c, 0x42]);
    let settings = settings_for(csv.path());

    let mut connector = MockWarehouseConnector::new();
    connector.expect_connect().times(0);

    let first = run_upload(&settings, &connector).await;
    assert!(error_message(&first).contains("Error reading CSV"));

    // The procedure is recoverable: a second call behaves identically.
    let second = run_upload(&settings, &connector).await;
    assert!(error_message(&second).contains("Error reading CSV"));
}

#[tokio::test]
async fn connect_failure_skips_bulk_load_and_verification() {
    let csv = write_csv(b"id\n1\n");
    let settings = settings_for(csv.path());

    let mut connector = MockWarehouseConnector::new();
    connector.expect_connect().times(1).returning(|| {
        Err(WarehouseError::AuthRejected(
            "invalid credentials".to_string(),
        ))
    });

    let result = run_upload(&settings, &connector).await;
    let message = error_message(&result);
    assert!(
        message.contains("Connection failed"),
        "unexpected message: {message}"
    );
    assert!(message.contains("invalid credentials"));
}

#[tokio::test]
async fn rejected_bulk_load_yields_fixed_message_and_releases_session() {
    let csv = write_csv(b"id\n1\n");
    let settings = settings_for(csv.path());

    let mut connector = MockWarehouseConnector::new();
    connector.expect_connect().times(1).returning(|| {
        let mut session = MockWarehouseSession::new();
        session.expect_bulk_insert().times(1).returning(|_, _| {
            Ok(BulkLoadOutcome {
                success: false,
                rows_loaded: 0,
            })
        });
        session.expect_count_rows().times(0);
        session.expect_close().times(1).returning(|| ());
        Ok(Box::new(session))
    });

    let result = run_upload(&settings, &connector).await;
    assert_eq!(error_message(&result), "Upload to Snowflake failed");
}

#[tokio::test]
async fn verification_failure_is_reported_and_releases_session() {
    let csv = write_csv(b"id\n1\n");
    let settings = settings_for(csv.path());

    let mut connector = MockWarehouseConnector::new();
    connector.expect_connect().times(1).returning(|| {
        let mut session = MockWarehouseSession::new();
        session.expect_bulk_insert().times(1).returning(|_, dataset| {
            Ok(BulkLoadOutcome {
                success: true,
                rows_loaded: dataset.row_count(),
            })
        });
        session
            .expect_count_rows()
            .times(1)
            .returning(|_| Err(WarehouseError::Statement("warehouse suspended".to_string())));
        session.expect_close().times(1).returning(|| ());
        Ok(Box::new(session))
    });

    let result = run_upload(&settings, &connector).await;
    let message = error_message(&result);
    assert!(message.contains("Upload error"), "got: {message}");
    assert!(message.contains("warehouse suspended"));
}

#[tokio::test]
async fn repeated_runs_append_rows_again() {
    let csv = write_csv(b"id,name\n1,a\n2,b\n");
    let settings = settings_for(csv.path());

    // Simulated remote table: each successful load appends, nothing resets.
    let table_total = Arc::new(AtomicI64::new(0));

    let mut connector = MockWarehouseConnector::new();
    let connect_total = table_total.clone();
    connector.expect_connect().times(2).returning(move || {
        let mut session = MockWarehouseSession::new();
        let insert_total = connect_total.clone();
        session.expect_bulk_insert().returning(move |_, dataset| {
            insert_total.fetch_add(dataset.row_count() as i64, Ordering::SeqCst);
            Ok(BulkLoadOutcome {
                success: true,
                rows_loaded: dataset.row_count(),
            })
        });
        let count_total = connect_total.clone();
        session
            .expect_count_rows()
            .returning(move |_| Ok(count_total.load(Ordering::SeqCst)));
        session.expect_close().returning(|| ());
        Ok(Box::new(session))
    });

    let first = run_upload(&settings, &connector).await;
    let second = run_upload(&settings, &connector).await;

    assert_eq!(
        first,
        UploadResult::Success {
            rows_uploaded: 2,
            total_rows_in_table: 2,
        }
    );
    assert_eq!(
        second,
        UploadResult::Success {
            rows_uploaded: 2,
            total_rows_in_table: 4,
        }
    );
}
