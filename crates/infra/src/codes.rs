//! Human-readable order codes: `{PREFIX}-{PXK|PNK}-{DDMMYY}-{NNN}`.

use chrono::{NaiveDate, Utc};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use stockroom_core::TenantId;
use stockroom_inventory::{LedgerError, OrderCodeGenerator, OrderDirection};

use crate::store::OrderStore;

/// Initials of a warehouse/system name: leading "Kho" dropped, diacritics
/// stripped, upper-cased. `"Kho Đà Nẵng"` becomes `"DN"`.
pub fn system_prefix(name: &str) -> String {
    let mut words = name.split_whitespace().peekable();
    if words.peek().is_some_and(|w| w.eq_ignore_ascii_case("kho")) {
        words.next();
    }

    words
        .filter_map(|word| word.chars().next())
        .map(strip_diacritics)
        .flat_map(char::to_uppercase)
        .collect()
}

fn strip_diacritics(c: char) -> char {
    match c {
        'đ' => 'd',
        'Đ' => 'D',
        _ => std::iter::once(c)
            .nfd()
            .find(|base| !is_combining_mark(*base))
            .unwrap_or(c),
    }
}

/// Build a code from its parts. `sequence` is 1-based.
pub fn format_order_code(prefix: &str, direction: OrderDirection, day: NaiveDate, sequence: u64) -> String {
    let date = day.format("%d%m%y");
    if prefix.is_empty() {
        format!("{}-{date}-{sequence:03}", direction.code_prefix())
    } else {
        format!("{prefix}-{}-{date}-{sequence:03}", direction.code_prefix())
    }
}

/// Numbers orders per tenant, direction and day from the order store.
///
/// The sequence is `count of today's orders + 1`; two callers racing on the
/// same day can get the same number, so codes are labels, not keys.
#[derive(Debug)]
pub struct DailyOrderCodeGenerator<S> {
    store: S,
    prefix: String,
}

impl<S: OrderStore> DailyOrderCodeGenerator<S> {
    pub fn new(store: S, system_name: &str) -> Self {
        Self {
            store,
            prefix: system_prefix(system_name),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn code_for(&self, tenant_id: TenantId, direction: OrderDirection, day: NaiveDate) -> Result<String, LedgerError> {
        let count = self.store.count_orders_on(tenant_id, direction, day)?;
        Ok(format_order_code(&self.prefix, direction, day, count + 1))
    }
}

impl<S: OrderStore> OrderCodeGenerator for DailyOrderCodeGenerator<S> {
    fn next_code(&self, tenant_id: TenantId, direction: OrderDirection) -> Result<String, LedgerError> {
        self.code_for(tenant_id, direction, Utc::now().date_naive())
    }
}
