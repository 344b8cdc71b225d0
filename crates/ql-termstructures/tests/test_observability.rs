//! Change propagation from quotes through helpers and curves to dependents.

use std::cell::Cell;
use std::rc::Rc;

use approx::assert_abs_diff_eq;
use ql_core::{register_with, CalculationStatus, Handle, LazyObject, ObserverFn, RelinkableHandle};
use ql_math::LogLinear;
use ql_quotes::{Quote, SimpleQuote};
use ql_termstructures::{
    BootstrapHelper, DepositRateHelper, Discount, PiecewiseYieldCurve, SwapRateHelper,
    YieldTermStructure,
};
use ql_time::{Actual360, Actual365Fixed, Date, TimeUnit};

type YieldHelper = Rc<dyn BootstrapHelper<dyn YieldTermStructure>>;

fn today() -> Date {
    Date::from_ymd(2025, 1, 2).unwrap()
}

fn counter() -> (Rc<Cell<u32>>, Rc<ObserverFn<impl Fn() -> ql_core::Result<()>>>) {
    let hits = Rc::new(Cell::new(0));
    let observer = {
        let hits = Rc::clone(&hits);
        ObserverFn::shared(move || {
            hits.set(hits.get() + 1);
            Ok(())
        })
    };
    (hits, observer)
}

fn curve_on(deposit: Handle<dyn Quote>, swap: Handle<dyn Quote>) -> Rc<PiecewiseYieldCurve> {
    let helpers: Vec<YieldHelper> = vec![
        Rc::new(
            DepositRateHelper::with_tenor(deposit, today(), 6, TimeUnit::Months, Actual360)
                .unwrap(),
        ),
        Rc::new(SwapRateHelper::new(swap, today(), 3, Actual360).unwrap()),
    ];
    PiecewiseYieldCurve::<Discount>::new(today(), helpers, Actual365Fixed, LogLinear).unwrap()
}

#[test]
fn relinking_a_quote_handle_rebuilds_the_curve() {
    let deposit = SimpleQuote::shared(0.03);
    let swap = RelinkableHandle::<dyn Quote>::linked_to(SimpleQuote::shared(0.035));
    let curve = curve_on(Handle::<dyn Quote>::new(deposit), swap.handle());
    let before = curve.data().unwrap();

    let (hits, observer) = counter();
    register_with(&observer, &*curve);

    swap.link_to(SimpleQuote::shared(0.04)).unwrap();
    assert_eq!(hits.get(), 1);
    assert_eq!(curve.status(), CalculationStatus::Dirty);

    let after = curve.data().unwrap();
    assert_eq!(before[..2], after[..2]);
    assert!(after[2] < before[2]);
    let residual = curve.helpers()[1].residual(&*curve).unwrap();
    assert_abs_diff_eq!(residual, 0.0, epsilon = 1e-9);
}

#[test]
fn only_the_first_change_is_forwarded() {
    let deposit = SimpleQuote::shared(0.03);
    let curve = curve_on(
        Handle::<dyn Quote>::new(deposit.clone()),
        Handle::<dyn Quote>::new(SimpleQuote::shared(0.035)),
    );
    curve.calculate().unwrap();

    let (hits, observer) = counter();
    register_with(&observer, &*curve);

    deposit.set_value(0.031).unwrap();
    deposit.set_value(0.032).unwrap();
    assert_eq!(hits.get(), 1);

    curve.calculate().unwrap();
    deposit.set_value(0.033).unwrap();
    assert_eq!(hits.get(), 2);
}

#[test]
fn frozen_curve_keeps_its_nodes() {
    let deposit = SimpleQuote::shared(0.03);
    let curve = curve_on(
        Handle::<dyn Quote>::new(deposit.clone()),
        Handle::<dyn Quote>::new(SimpleQuote::shared(0.035)),
    );
    let original = curve.data().unwrap();

    let (hits, observer) = counter();
    register_with(&observer, &*curve);

    curve.freeze();
    deposit.set_value(0.05).unwrap();
    assert!(curve.is_frozen());
    assert_eq!(hits.get(), 0);
    assert_eq!(curve.data().unwrap(), original);

    curve.unfreeze().unwrap();
    assert_eq!(hits.get(), 1);
    assert_eq!(curve.status(), CalculationStatus::Dirty);
    let updated = curve.data().unwrap();
    assert!(updated[1] < original[1]);
}

#[test]
fn unfreeze_without_changes_is_silent() {
    let curve = curve_on(
        Handle::<dyn Quote>::new(SimpleQuote::shared(0.03)),
        Handle::<dyn Quote>::new(SimpleQuote::shared(0.035)),
    );
    curve.calculate().unwrap();
    let (hits, observer) = counter();
    register_with(&observer, &*curve);

    curve.freeze();
    curve.unfreeze().unwrap();
    assert_eq!(hits.get(), 0);
    assert_eq!(curve.status(), CalculationStatus::Fresh);
}

#[test]
fn dropped_curves_leave_quotes_usable() {
    let deposit = SimpleQuote::shared(0.03);
    {
        let curve = curve_on(
            Handle::<dyn Quote>::new(deposit.clone()),
            Handle::<dyn Quote>::new(SimpleQuote::shared(0.035)),
        );
        curve.calculate().unwrap();
    }
    assert!(deposit.set_value(0.04).is_ok());
    assert_eq!(deposit.value(), Some(0.04));
}
