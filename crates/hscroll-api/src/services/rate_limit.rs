//! Daily analysis budget.
//!
//! A process-wide counter of new (cache-missing) analyses, windowed by the
//! civil date in the service's designated timezone. Cache hits never touch
//! it: the orchestrator commits only after deciding to build.
//!
//! Multi-process deployments get loose global semantics (one counter per
//! process); a strict cap would back this with the shared cache store.

use std::sync::Mutex;

use chrono::{FixedOffset, NaiveDate, Utc};
use tracing::{info, warn};

/// Budget windows roll at midnight IST (UTC+05:30, no DST).
const WINDOW_UTC_OFFSET_SECS: i32 = 5 * 3600 + 1800;

/// Snapshot of the current window, as seen by `precheck`.
#[derive(Debug, Clone, Copy)]
pub struct BudgetSnapshot {
    pub count: u32,
    pub limit: u32,
}

impl BudgetSnapshot {
    pub fn exhausted(&self) -> bool {
        self.count >= self.limit
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.count)
    }
}

#[derive(Debug)]
struct BudgetWindow {
    date: NaiveDate,
    count: u32,
}

/// Daily-new-analyses counter with atomic check-and-increment.
#[derive(Debug)]
pub struct DailyBudget {
    limit: u32,
    window: Mutex<BudgetWindow>,
}

impl DailyBudget {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            window: Mutex::new(BudgetWindow {
                date: current_window_date(),
                count: 0,
            }),
        }
    }

    /// Read the current window without committing.
    pub fn precheck(&self) -> BudgetSnapshot {
        self.precheck_at(current_window_date())
    }

    /// Atomically check the bound and increment the counter. Called only
    /// on the cache-miss path; returns the count after increment, or the
    /// exhausted snapshot.
    pub fn commit(&self) -> Result<u32, BudgetSnapshot> {
        self.commit_at(current_window_date())
    }

    fn precheck_at(&self, today: NaiveDate) -> BudgetSnapshot {
        let mut window = self.window.lock().expect("budget mutex poisoned");
        Self::roll_window(&mut window, today);
        BudgetSnapshot {
            count: window.count,
            limit: self.limit,
        }
    }

    fn commit_at(&self, today: NaiveDate) -> Result<u32, BudgetSnapshot> {
        let mut window = self.window.lock().expect("budget mutex poisoned");
        Self::roll_window(&mut window, today);

        if window.count >= self.limit {
            warn!(
                count = window.count,
                limit = self.limit,
                "Daily analysis budget exhausted"
            );
            return Err(BudgetSnapshot {
                count: window.count,
                limit: self.limit,
            });
        }

        window.count += 1;
        info!(
            count = window.count,
            limit = self.limit,
            "New video analysis committed against daily budget"
        );
        Ok(window.count)
    }

    fn roll_window(window: &mut BudgetWindow, today: NaiveDate) {
        if today != window.date {
            info!(window = %today, "Daily analysis budget window reset");
            window.date = today;
            window.count = 0;
        }
    }
}

fn current_window_date() -> NaiveDate {
    let offset =
        FixedOffset::east_opt(WINDOW_UTC_OFFSET_SECS).expect("valid fixed UTC offset");
    Utc::now().with_timezone(&offset).date_naive()
}
