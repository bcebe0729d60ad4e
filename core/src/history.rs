//! Order-history normalization.
//!
//! Backend task records are projected field-for-field into `OrderRecord`.
//! Values are passed through unchanged; only a missing or null
//! `selectReason` is defaulted, to the empty string.

use serde_json::Value;

use crate::types::{OrderItem, OrderRecord, TaskRecord};

impl From<TaskRecord> for OrderRecord {
    fn from(task: TaskRecord) -> Self {
        Self {
            order_id: task.uid,
            item: OrderItem {
                name: task.order_dish,
                uid: task.account_name,
            },
            dates: vec![task.order_date],
            status: task.order_status,
            create_time: task.create_date,
            error_msg: task.error_msg,
            select_reason: match task.select_reason {
                Value::Null => Value::String(String::new()),
                reason => reason,
            },
        }
    }
}

pub fn normalize(records: Vec<TaskRecord>) -> Vec<OrderRecord> {
    records.into_iter().map(OrderRecord::from).collect()
}
