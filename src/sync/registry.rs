// Table-name -> handler dispatch map, built once at startup.
use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::sync::handler::TableHandler;
use crate::sync::tables;

/// Write-once registry; never mutated after construction.
static REGISTRY: Lazy<HashMap<&'static str, Box<dyn TableHandler>>> = Lazy::new(|| {
    let handlers: Vec<Box<dyn TableHandler>> = vec![
        Box::new(tables::schedules::ScheduleHandler),
        Box::new(tables::invoices::InvoiceHandler),
        Box::new(tables::photos::PhotoHandler),
        Box::new(tables::availabilities::AvailabilityHandler),
        Box::new(tables::timeoff::TimeOffRequestHandler),
        Box::new(tables::payroll::PayrollPeriodHandler),
        Box::new(tables::reports::ReportHandler),
        Box::new(tables::push_tokens::PushTokenHandler),
    ];

    handlers.into_iter().map(|h| (h.table(), h)).collect()
});

pub fn handler_for(table: &str) -> Option<&'static dyn TableHandler> {
    REGISTRY.get(table).map(|h| h.as_ref())
}

pub fn is_supported(table: &str) -> bool {
    REGISTRY.contains_key(table)
}

/// Supported wire names, sorted for stable error messages
pub fn supported_tables() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = REGISTRY.keys().copied().collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_all_eight_tables() {
        let names = supported_tables();
        assert_eq!(
            names,
            vec![
                "availabilities",
                "expopushtokens",
                "invoices",
                "payrollperiods",
                "photos",
                "reports",
                "schedules",
                "timeoffrequests",
            ]
        );
    }

    #[test]
    fn lookup_matches_handler_table_name() {
        for name in supported_tables() {
            let handler = handler_for(name).expect("registered handler");
            assert_eq!(handler.table(), name);
        }
        assert!(handler_for("clients").is_none());
    }

    #[test]
    fn only_photos_supports_batch_patch() {
        for name in supported_tables() {
            let handler = handler_for(name).unwrap();
            assert_eq!(handler.supports_batch_patch(), name == "photos");
        }
    }

    fn lazy_pool() -> sqlx::PgPool {
        // Never connects; the default batch rejections return before any query
        sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://fieldops@localhost/fieldops_sync")
            .unwrap()
    }

    #[tokio::test]
    async fn batch_put_rejected_for_non_photo_tables() {
        let pool = lazy_pool();
        for name in supported_tables() {
            if name == "photos" {
                continue;
            }
            let result = handler_for(name).unwrap().batch_put(&pool, vec![]).await;
            assert!(!result.success);
            assert_eq!(result.status, axum::http::StatusCode::BAD_REQUEST);
            assert!(result.message.unwrap().contains(name));
        }
    }

    #[tokio::test]
    async fn batch_patch_rejected_for_non_photo_tables() {
        let pool = lazy_pool();
        for name in supported_tables() {
            if name == "photos" {
                continue;
            }
            let result = handler_for(name).unwrap().batch_patch(&pool, vec![]).await;
            assert!(!result.success);
            assert!(result.message.unwrap().contains(name));
        }
    }
}
