use proptest::prelude::*;
use storefront_cart::{
    CartLine, CartSnapshot, CartStore, ColorStock, CountPrice, InMemoryPersistence, Product, QuantityChange,
    Region, RemovePolicy, VariantSelection,
};
use rust_decimal::Decimal;

const COLORS: [&str; 3] = ["Red", "Blue", "Green"];
const OPTIONS: [&str; 2] = ["10-pack", "20-pack"];

fn product(color_stock: [u32; 3], option_stock: [u32; 2]) -> Product {
    Product {
        id: "P1".into(),
        price: Decimal::from(5),
        stock: Some(100),
        colors: COLORS.iter().map(|c| c.to_string()).collect(),
        colors_stock: COLORS.iter().zip(color_stock).map(|(c, s)| ColorStock { color: c.to_string(), stock: Some(s) }).collect(),
        count_prices: OPTIONS
            .iter()
            .zip(option_stock)
            .map(|(o, s)| CountPrice { count: o.to_string(), price: Decimal::from(9), stock: Some(s) })
            .collect(),
        ..Product::default()
    }
}

#[derive(Clone, Debug)]
enum Op {
    Add { color: usize, option: usize, qty: u32 },
    Step { color: usize, option: usize, up: bool },
    Remove { color: usize, option: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..3usize, 0..2usize, 1..6u32).prop_map(|(color, option, qty)| Op::Add { color, option, qty }),
        2 => (0..3usize, 0..2usize, any::<bool>()).prop_map(|(color, option, up)| Op::Step { color, option, up }),
        1 => (0..3usize, 0..2usize).prop_map(|(color, option)| Op::Remove { color, option }),
    ]
}

fn selection(color: usize, option: usize) -> VariantSelection {
    VariantSelection::product("P1").with_color(COLORS[color]).with_option(OPTIONS[option])
}

fn run(product: &Product, ops: &[Op]) -> CartStore<InMemoryPersistence> {
    let mut store = CartStore::open(InMemoryPersistence::new(), Region::Oman, RemovePolicy::Exact);
    for op in ops {
        match *op {
            Op::Add { color, option, qty } => {
                let line = product.line_for(&selection(color, option), i64::from(qty)).unwrap();
                store.add(line, qty);
            }
            Op::Step { color, option, up } => {
                let change = if up { QuantityChange::Increment } else { QuantityChange::Decrement };
                store.update_quantity(&selection(color, option), change);
            }
            Op::Remove { color, option } => {
                store.remove(&selection(color, option));
            }
        }
    }
    store
}

fn held(lines: &[CartLine], pick: impl Fn(&CartLine) -> bool) -> u32 {
    lines.iter().filter(|l| pick(l)).map(|l| l.quantity).sum()
}

proptest! {
    #[test]
    fn test_repeated_adds_never_exceed_stock(stock in 0..20u32, adds in prop::collection::vec(1..8u32, 1..10)) {
        let mut store = CartStore::open(InMemoryPersistence::new(), Region::Oman, RemovePolicy::Legacy);
        for qty in adds {
            let line = CartLine { product_id: "P1".into(), stock: Some(stock), ..CartLine::default() };
            store.add(line, qty);
            let total: u32 = store.state().lines().iter().map(|l| l.quantity).sum();
            prop_assert!(total <= stock);
            prop_assert!(store.state().lines().len() <= 1);
        }
    }

    #[test]
    fn test_merge_law(q1 in 1..10u32, q2 in 1..10u32) {
        let mut store = CartStore::open(InMemoryPersistence::new(), Region::Oman, RemovePolicy::Legacy);
        let line = CartLine { product_id: "P1".into(), chosen_color: Some("Red".into()), stock: Some(20), ..CartLine::default() };
        store.add(line.clone(), q1);
        store.add(CartLine { chosen_color: Some(" RED ".into()), ..line }, q2);
        prop_assert_eq!(store.state().lines().len(), 1);
        prop_assert_eq!(store.state().lines()[0].quantity, q1 + q2);
    }

    #[test]
    fn test_ledgers_are_conserved(
        color_stock in prop::array::uniform3(0..6u32),
        option_stock in prop::array::uniform2(0..8u32),
        ops in prop::collection::vec(op(), 1..30),
    ) {
        let product = product(color_stock, option_stock);
        let store = run(&product, &ops);
        let lines = store.state().lines();
        for (i, color) in COLORS.iter().enumerate() {
            prop_assert!(held(lines, |l| l.chosen_color.as_deref() == Some(*color)) <= color_stock[i]);
            for (j, option) in OPTIONS.iter().enumerate() {
                let pair = held(lines, |l| l.chosen_color.as_deref() == Some(*color) && l.chosen_option_label.as_deref() == Some(*option));
                prop_assert!(pair <= color_stock[i].min(option_stock[j]));
            }
        }
        for (j, option) in OPTIONS.iter().enumerate() {
            prop_assert!(held(lines, |l| l.chosen_option_label.as_deref() == Some(*option)) <= option_stock[j]);
        }
        prop_assert!(lines.iter().all(|l| l.quantity >= 1));
    }

    #[test]
    fn test_normalization_is_idempotent(
        color_stock in prop::array::uniform3(0..6u32),
        option_stock in prop::array::uniform2(0..8u32),
        ops in prop::collection::vec(op(), 1..30),
    ) {
        let store = run(&product(color_stock, option_stock), &ops);
        let mut again = store.state().clone();
        prop_assert!(again.normalize().is_empty());
        prop_assert_eq!(&again, store.state());
    }

    #[test]
    fn test_snapshot_round_trip_is_stable(
        color_stock in prop::array::uniform3(0..6u32),
        option_stock in prop::array::uniform2(0..8u32),
        ops in prop::collection::vec(op(), 1..20),
    ) {
        let store = run(&product(color_stock, option_stock), &ops);
        let raw = store.snapshot().encode().unwrap();
        let (restored, events) = CartSnapshot::decode(&raw).unwrap().into_state();
        prop_assert!(events.is_empty());
        prop_assert_eq!(&restored, store.state());
    }
}
