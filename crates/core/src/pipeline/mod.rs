pub mod alert_loop;
pub mod ingestion_loop;
pub mod watch_door_use_case;
