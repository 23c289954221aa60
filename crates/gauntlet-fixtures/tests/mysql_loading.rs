//! End-to-end loading against a recording MySQL connection.

mod helpers;

use std::sync::Arc;

use gauntlet_fixtures::backends::QueryValue;
use gauntlet_fixtures::{FixtureError, FixtureLoader, Loader};
use helpers::mock_db::MockConnection;
use helpers::test_data::TestDataLoader;
use rstest::rstest;
use serde_json::json;

fn names(names: &[&str]) -> Vec<String> {
	names.iter().map(|n| n.to_string()).collect()
}

fn loader(connection: &MockConnection) -> FixtureLoader {
	helpers::init_tracing();
	FixtureLoader::new(Arc::new(connection.clone()), TestDataLoader::new().config())
}

#[rstest]
#[tokio::test]
async fn test_rows_are_inserted_one_by_one_and_read_back() {
	let connection = MockConnection::mysql();
	connection.push_insert_id(Some(7));
	connection.push_rows(vec![json!({"id": 7, "active": 1, "name": "Alice", "role": "admin"})]);
	connection.push_insert_id(Some(8));
	connection.push_rows(vec![json!({"id": 8, "active": 1, "name": "Bob", "role": "member"})]);
	connection.push_insert_id(Some(100));
	connection.push_rows(vec![json!({"id": 100, "user_id": 7})]);
	connection.push_insert_id(None);

	loader(&connection).load(&names(&["orders"])).await.unwrap();

	assert_eq!(
		connection.log(),
		vec![
			"BEGIN",
			"TRUNCATE TABLE `users`",
			"TRUNCATE TABLE `orders`",
			"TRUNCATE TABLE `order_items`",
			"COMMIT",
			"BEGIN",
			"INSERT INTO `users` (`active`, `name`, `role`) VALUES (true, 'Alice', 'admin')",
			"SELECT * FROM `users` WHERE `id` = ?",
			"INSERT INTO `users` (`active`, `name`, `role`) VALUES (true, 'Bob', 'member')",
			"SELECT * FROM `users` WHERE `id` = ?",
			"INSERT INTO `orders` (`placed_at`, `total`, `user_id`) VALUES ((NOW()), 10.5, 7)",
			"SELECT * FROM `orders` WHERE `id` = ?",
			"INSERT INTO `order_items` (`order_id`, `sku`) VALUES (100, 'it''s')",
			"COMMIT",
		]
	);
	assert_eq!(
		connection.params(),
		vec![
			vec![QueryValue::UInt(7)],
			vec![QueryValue::UInt(8)],
			vec![QueryValue::UInt(100)],
		]
	);
}

#[rstest]
#[tokio::test]
async fn test_each_row_keeps_its_own_columns() {
	let connection = MockConnection::mysql();

	loader(&connection).load(&names(&["table"])).await.unwrap();

	let inserts: Vec<String> = connection
		.statements()
		.into_iter()
		.filter(|s| s.starts_with("INSERT"))
		.collect();
	assert_eq!(
		inserts,
		vec![
			"INSERT INTO `table` (`field1`, `field2`) VALUES ('value1', 1)",
			"INSERT INTO `table` (`field1`, `field2`, `field3`) VALUES ('value2', 2, 2.5699477736545666)",
			"INSERT INTO `table` (`field1`, `field4`, `field5`) VALUES ('\"', false, NULL)",
			"INSERT INTO `table` (`field1`, `field5`) VALUES ('''', '[1,\"2\"]')",
		]
	);
}

#[rstest]
#[tokio::test]
async fn test_table_without_id_column_skips_capture() {
	let connection = MockConnection::mysql();
	connection.push_insert_id(Some(5));
	connection.push_error(FixtureError::MissingPrimaryKeyColumn(
		"Unknown column 'id' in 'where clause'".to_string(),
	));

	loader(&connection).load(&names(&["settings"])).await.unwrap();

	assert_eq!(connection.log().last().unwrap(), "COMMIT");
}

#[rstest]
#[tokio::test]
async fn test_reference_to_uncaptured_row_fails() {
	let connection = MockConnection::mysql();
	connection.push_insert_id(Some(5));
	connection.push_error(FixtureError::MissingPrimaryKeyColumn(
		"Unknown column 'id' in 'where clause'".to_string(),
	));

	let err = loader(&connection)
		.load(&names(&["settings_flags"]))
		.await
		.unwrap_err();

	assert!(matches!(err.root_cause(), FixtureError::UndefinedReference(_)));
	assert!(err.to_string().starts_with("table `flags`: field 'setting' (row 0 of `flags`)"));
	assert_eq!(connection.log().last().unwrap(), "ROLLBACK");
}

#[rstest]
#[tokio::test]
async fn test_read_back_failure_is_fatal() {
	let connection = MockConnection::mysql();
	connection.push_insert_id(Some(5));
	connection.push_error(FixtureError::SqlExecution("connection reset".to_string()));

	let err = loader(&connection)
		.load(&names(&["settings"]))
		.await
		.unwrap_err();

	assert!(matches!(err.root_cause(), FixtureError::SqlExecution(_)));
	assert_eq!(connection.log().last().unwrap(), "ROLLBACK");
}

#[rstest]
#[tokio::test]
async fn test_no_sequence_fixup() {
	let connection = MockConnection::mysql();

	loader(&connection).load(&names(&["three_tables"])).await.unwrap();

	assert_eq!(
		connection.statements(),
		vec![
			"TRUNCATE TABLE `a`",
			"TRUNCATE TABLE `b`",
			"TRUNCATE TABLE `c`",
			"INSERT INTO `a` (`id`) VALUES (1)",
			"INSERT INTO `b` (`id`) VALUES (2)",
			"INSERT INTO `c` (`id`) VALUES (3)",
		]
	);
}

#[rstest]
#[tokio::test]
async fn test_missing_read_back_row_fails() {
	let connection = MockConnection::mysql();
	connection.push_insert_id(Some(7));
	connection.push_rows(vec![]);

	let err = loader(&connection)
		.load(&names(&["users"]))
		.await
		.unwrap_err();

	assert!(matches!(err.root_cause(), FixtureError::SqlExecution(_)));
	assert_eq!(
		err.to_string(),
		"table `users`: SQL execution error: can't get inserted row with id 7"
	);
	assert_eq!(connection.log().last().unwrap(), "ROLLBACK");
	assert!(!connection.log().iter().any(|s| s == "COMMIT"));
}

#[rstest]
#[tokio::test]
async fn test_truncate_commits_before_insert_transaction() {
	let connection = MockConnection::mysql().fail_on("INSERT INTO `b`");

	let err = loader(&connection)
		.load(&names(&["three_tables"]))
		.await
		.unwrap_err();

	assert!(err.to_string().starts_with("table `b`: SQL execution error"));
	assert_eq!(
		connection.log(),
		vec![
			"BEGIN",
			"TRUNCATE TABLE `a`",
			"TRUNCATE TABLE `b`",
			"TRUNCATE TABLE `c`",
			"COMMIT",
			"BEGIN",
			"INSERT INTO `a` (`id`) VALUES (1)",
			"INSERT INTO `b` (`id`) VALUES (2)",
			"ROLLBACK",
		]
	);
}

#[rstest]
#[tokio::test]
async fn test_failed_truncate_never_opens_insert_transaction() {
	let connection = MockConnection::mysql().fail_on("TRUNCATE TABLE `b`");

	let err = loader(&connection)
		.load(&names(&["three_tables"]))
		.await
		.unwrap_err();

	assert!(err.to_string().starts_with("truncate: SQL execution error"));
	assert_eq!(
		connection.log(),
		vec!["BEGIN", "TRUNCATE TABLE `a`", "TRUNCATE TABLE `b`", "ROLLBACK"]
	);
}
