//! Automatic unbundling.
//!
//! When a request for a finer unit exceeds its liquid stock, coarser source
//! units are broken open: an outbound `Conversion` order removes them and an
//! inbound `Conversion` order adds the finer units they contain. Both legs are
//! handed to a [`TransactionalLedger`] as one pair.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockroom_core::{DomainError, ExpectedVersion, OrderId, ProductId, TenantId, ceil_units, to_fixed};

use crate::aggregator::StockTotals;
use crate::ledger::{ConversionPair, LedgerError, OrderCodeGenerator, PositionKey, TransactionalLedger};
use crate::order::{CONVERSION_KIND, Order, OrderDirection, OrderLine, OrderStatus};

/// Appended to generated codes of synthesized orders.
pub const AUTO_CODE_SUFFIX: &str = "-AUTO";

/// Source units needed to cover `deficit` requested units at `rate`
/// requested-per-source.
///
/// `None` when nothing needs breaking or the rate is unusable.
pub fn units_to_break(deficit: f64, rate: f64) -> Option<f64> {
    if !rate.is_finite() || rate <= 0.0 || !deficit.is_finite() || deficit <= 0.0 {
        return None;
    }
    let units = ceil_units(deficit / rate);
    (units > 0.0).then_some(units)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnbundleRequest {
    pub tenant_id: TenantId,
    pub warehouse: String,
    pub product_id: ProductId,
    pub product_name: String,
    /// Unit being broken open.
    pub source_unit: String,
    pub requested_unit: String,
    pub requested_qty: f64,
    /// Liquid stock already on hand in the requested unit.
    pub current_liquid: f64,
    pub unit_cost: Decimal,
    /// Requested units per source unit.
    pub rate: f64,
    /// Code of the order that triggered the shortfall.
    pub origin_order_code: String,
    pub order_type: Option<String>,
}

impl UnbundleRequest {
    pub fn position(&self) -> PositionKey {
        PositionKey::new(self.tenant_id, self.warehouse.as_str(), self.product_id)
    }

    pub fn deficit(&self) -> f64 {
        self.requested_qty - self.current_liquid
    }
}

/// A committed unbundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnbundleOutcome {
    pub units_broken: Decimal,
    pub units_produced: Decimal,
    pub pair: ConversionPair,
    /// Stock version of the position after the commit.
    pub version: u64,
}

impl UnbundleOutcome {
    /// Move the broken and produced quantities in an in-flight liquidity view.
    pub fn apply_to(&self, liquidity: &mut StockTotals) {
        for (leg, sign) in [(&self.pair.outbound, Decimal::NEGATIVE_ONE), (&self.pair.inbound, Decimal::ONE)] {
            for line in &leg.lines {
                liquidity.add(line.product_id, &line.unit, line.quantity * sign);
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum UnbundleError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl UnbundleError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, UnbundleError::Ledger(LedgerError::Conflict(_)))
    }
}

/// Builds conversion pairs and commits them through a ledger.
#[derive(Debug)]
pub struct AutoUnbundleEngine<G, L> {
    codes: G,
    ledger: L,
}

impl<G, L> AutoUnbundleEngine<G, L>
where
    G: OrderCodeGenerator,
    L: TransactionalLedger,
{
    pub fn new(codes: G, ledger: L) -> Self {
        Self { codes, ledger }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Break enough source units to cover the request's deficit.
    ///
    /// Returns `Ok(None)` when there is no deficit or the rate is unusable;
    /// nothing is written in that case.
    pub fn execute(
        &self,
        request: &UnbundleRequest,
        expected_version: ExpectedVersion,
    ) -> Result<Option<UnbundleOutcome>, UnbundleError> {
        let Some(units) = units_to_break(request.deficit(), request.rate) else {
            tracing::debug!(
                product_id = %request.product_id,
                deficit = request.deficit(),
                rate = request.rate,
                "nothing to unbundle"
            );
            return Ok(None);
        };

        let pair = self.build_pair(request, units)?;
        let version = self.ledger.commit_pair(&pair, expected_version)?;

        let units_broken = pair.outbound.lines[0].quantity;
        let units_produced = pair.inbound.lines[0].quantity;

        tracing::info!(
            tenant_id = %request.tenant_id,
            warehouse = %request.warehouse,
            product_id = %request.product_id,
            outbound = %pair.outbound.code,
            inbound = %pair.inbound.code,
            %units_broken,
            %units_produced,
            version,
            "unbundle committed"
        );

        Ok(Some(UnbundleOutcome {
            units_broken,
            units_produced,
            pair,
            version,
        }))
    }

    /// Build both legs for breaking `units` source units. Nothing is persisted.
    pub fn build_pair(&self, request: &UnbundleRequest, units: f64) -> Result<ConversionPair, UnbundleError> {
        let broken = to_fixed(units)?;
        let produced = to_fixed(units * request.rate)?;

        let outbound = self.leg(request, OrderDirection::Outbound, &request.source_unit, broken)?;
        let inbound = self.leg(request, OrderDirection::Inbound, &request.requested_unit, produced)?;

        let pair = ConversionPair {
            position: request.position(),
            outbound,
            inbound,
        };
        pair.validate()?;
        Ok(pair)
    }

    fn leg(
        &self,
        request: &UnbundleRequest,
        direction: OrderDirection,
        unit: &str,
        quantity: Decimal,
    ) -> Result<Order, UnbundleError> {
        let code = self.codes.next_code(request.tenant_id, direction)?;
        Ok(Order {
            id: OrderId::new(),
            tenant_id: request.tenant_id,
            code: format!("{code}{AUTO_CODE_SUFFIX}"),
            direction,
            kind: CONVERSION_KIND.to_string(),
            status: OrderStatus::Completed,
            order_type: request.order_type.clone(),
            warehouse: request.warehouse.trim().to_string(),
            description: Some(format!("Auto unbundle for order {}", request.origin_order_code)),
            lines: vec![OrderLine {
                product_id: request.product_id,
                product_name: request.product_name.clone(),
                unit: unit.to_string(),
                quantity,
                price: request.unit_cost,
            }],
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Codes {
        counters: Mutex<HashMap<OrderDirection, u32>>,
    }

    impl OrderCodeGenerator for Codes {
        fn next_code(&self, _tenant_id: TenantId, direction: OrderDirection) -> Result<String, LedgerError> {
            let mut counters = self.counters.lock().unwrap();
            let n = counters.entry(direction).or_default();
            *n += 1;
            Ok(format!("KC-{}-011024-{:03}", direction.code_prefix(), n))
        }
    }

    #[derive(Default)]
    struct RecordingLedger {
        pairs: Mutex<Vec<ConversionPair>>,
        fail_with_conflict: bool,
    }

    impl TransactionalLedger for RecordingLedger {
        fn stock_version(&self, _position: &PositionKey) -> Result<u64, LedgerError> {
            Ok(self.pairs.lock().unwrap().len() as u64)
        }

        fn commit_pair(&self, pair: &ConversionPair, expected: ExpectedVersion) -> Result<u64, LedgerError> {
            if self.fail_with_conflict {
                return Err(LedgerError::Conflict("stale".to_string()));
            }
            let mut pairs = self.pairs.lock().unwrap();
            expected.check(pairs.len() as u64)?;
            pairs.push(pair.clone());
            Ok(pairs.len() as u64)
        }
    }

    fn request(requested: f64, liquid: f64, rate: f64) -> UnbundleRequest {
        UnbundleRequest {
            tenant_id: TenantId::new(),
            warehouse: "Kho chính".to_string(),
            product_id: ProductId::new(),
            product_name: "Bia 333".to_string(),
            source_unit: "Thung".to_string(),
            requested_unit: "Lon".to_string(),
            requested_qty: requested,
            current_liquid: liquid,
            unit_cost: Decimal::new(12_500, 0),
            rate,
            origin_order_code: "KC-PXK-011024-007".to_string(),
            order_type: Some("conversion".to_string()),
        }
    }

    fn engine() -> AutoUnbundleEngine<Codes, RecordingLedger> {
        AutoUnbundleEngine::new(Codes::default(), RecordingLedger::default())
    }

    #[test]
    fn breaks_one_case_for_a_twenty_can_deficit() {
        let engine = engine();
        let outcome = engine
            .execute(&request(30.0, 10.0, 24.0), ExpectedVersion::Exact(0))
            .unwrap()
            .unwrap();

        assert_eq!(outcome.units_broken, Decimal::ONE);
        assert_eq!(outcome.units_produced, Decimal::from(24));
        assert_eq!(outcome.version, 1);

        let pair = &outcome.pair;
        assert_eq!(pair.outbound.code, "KC-PXK-011024-001-AUTO");
        assert_eq!(pair.inbound.code, "KC-PNK-011024-001-AUTO");
        assert_eq!(pair.outbound.lines[0].unit, "Thung");
        assert_eq!(pair.inbound.lines[0].unit, "Lon");
        assert_eq!(pair.outbound.kind, CONVERSION_KIND);
        assert_eq!(pair.inbound.status, OrderStatus::Completed);
        assert_eq!(pair.inbound.lines[0].price, Decimal::new(12_500, 0));
        assert_eq!(
            pair.outbound.description.as_deref(),
            Some("Auto unbundle for order KC-PXK-011024-007")
        );
        assert_eq!(engine.ledger().pairs.lock().unwrap().len(), 1);

        let mut liquidity = StockTotals::new();
        liquidity.add(pair.position.product_id, "Lon", Decimal::from(10));
        liquidity.add(pair.position.product_id, "Thung", Decimal::from(2));
        outcome.apply_to(&mut liquidity);
        assert_eq!(liquidity.get(pair.position.product_id, "Lon"), Decimal::from(34));
        assert_eq!(liquidity.get(pair.position.product_id, "Thung"), Decimal::ONE);
    }

    #[test]
    fn exact_multiple_breaks_exactly_one() {
        assert_eq!(units_to_break(24.0, 24.0), Some(1.0));
        assert_eq!(units_to_break(48.0, 24.0), Some(2.0));
        assert_eq!(units_to_break(24.5, 24.0), Some(2.0));
    }

    #[test]
    fn no_deficit_is_a_no_op() {
        let engine = engine();
        assert!(engine.execute(&request(10.0, 10.0, 24.0), ExpectedVersion::Any).unwrap().is_none());
        assert!(engine.execute(&request(5.0, 10.0, 24.0), ExpectedVersion::Any).unwrap().is_none());
        assert!(engine.ledger().pairs.lock().unwrap().is_empty());
    }

    #[test]
    fn unusable_rate_is_a_no_op() {
        let engine = engine();
        for rate in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            assert!(engine.execute(&request(30.0, 0.0, rate), ExpectedVersion::Any).unwrap().is_none());
        }
        assert!(engine.ledger().pairs.lock().unwrap().is_empty());
    }

    #[test]
    fn fractional_rates_round_to_six_places() {
        let engine = engine();
        // Breaking kilograms into 1/3 kg portions.
        let outcome = engine
            .execute(&request(1.0, 0.0, 1.0 / 3.0), ExpectedVersion::Any)
            .unwrap()
            .unwrap();
        assert_eq!(outcome.units_broken, Decimal::from(3));
        assert_eq!(outcome.units_produced, Decimal::ONE);
    }

    #[test]
    fn stale_version_writes_nothing() {
        let engine = engine();
        let err = engine
            .execute(&request(30.0, 10.0, 24.0), ExpectedVersion::Exact(7))
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(engine.ledger().pairs.lock().unwrap().is_empty());
    }

    #[test]
    fn ledger_conflict_surfaces() {
        let engine = AutoUnbundleEngine::new(
            Codes::default(),
            RecordingLedger {
                fail_with_conflict: true,
                ..Default::default()
            },
        );
        let err = engine.execute(&request(30.0, 10.0, 24.0), ExpectedVersion::Any).unwrap_err();
        assert!(matches!(err, UnbundleError::Ledger(LedgerError::Conflict(_))));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: k × rate deficit breaks exactly k units.
            #[test]
            fn exact_multiples_break_k(k in 1u32..10_000, rate in prop::sample::select(vec![1.0, 2.0, 6.0, 12.0, 24.0, 50.0, 1000.0])) {
                let deficit = k as f64 * rate;
                prop_assert_eq!(units_to_break(deficit, rate), Some(k as f64));
            }

            /// Property: broken units always cover the deficit.
            #[test]
            fn broken_units_cover_deficit(deficit in 0.01f64..1.0e5, rate in 0.01f64..1.0e3) {
                let units = units_to_break(deficit, rate).unwrap();
                prop_assert!(units * rate >= deficit - 1.0e-6 * rate - 1.0e-9);
                prop_assert!((units - 1.0) * rate < deficit);
            }
        }
    }
}
