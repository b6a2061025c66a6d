use dice_tree::common::Int;
use dice_tree::parse::ast::{attr, Node};
use dice_tree::{parse, roll, roll_with, EvalError, FunctionTable, Interpreter, Limits, Number, Roller};
use pretty_assertions::assert_eq;
use rand::{rngs::StdRng, SeedableRng};

struct ConstRoller(Int);

impl Roller for ConstRoller {
    fn number_between(&mut self, min: Int, max: Int) -> Int {
        self.0.clamp(min, max)
    }
}

fn seeded(seed: u64) -> Interpreter<StdRng> {
    Interpreter::with_roller(StdRng::seed_from_u64(seed))
}

fn faces(rolls: &[&Node]) -> Vec<Int> {
    rolls.iter().map(|roll| roll.value().unwrap().as_int()).collect()
}

fn run_const(input: &str, expected: impl Into<Number>) {
    let result = roll_with(input, &mut Interpreter::with_roller(ConstRoller(4))).unwrap();
    assert_eq!(result.errors(), &[] as &[String]);
    assert_eq!(result.total(), expected.into());
}

#[test]
fn test_constant_rolls() {
    run_const("1d20", 4);
    run_const("4d6kh3", 12);
    run_const("2d6 + 1d8 * 2", 16);
    run_const("3d6!", 12);
    run_const("{2d20kl}...3", 12);
    run_const("(5/2)d4", 12);
}

#[test]
fn test_constant_successes() {
    let result = roll_with("3d6 >= 4", &mut Interpreter::with_roller(ConstRoller(4))).unwrap();
    assert_eq!(result.total(), Number::from(3));
    assert_eq!((result.successes(), result.fails()), (3, 0));
}

#[test]
fn test_same_seed_same_roll() {
    let first = roll_with("4d6!kh3 + 1d20", &mut seeded(42)).unwrap();
    let second = roll_with("4d6!kh3 + 1d20", &mut seeded(42)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_keep_highest_keeps_largest() {
    for seed in 0..50 {
        let result = roll_with("4d6kh2", &mut seeded(seed)).unwrap();
        let rolls = result.dice_rolls();
        assert_eq!(rolls.len(), 4);

        let mut kept: Vec<_> = rolls.iter().filter(|roll| roll.is_kept()).collect();
        let dropped: Vec<_> = rolls.iter().filter(|roll| !roll.is_kept()).collect();
        assert_eq!((kept.len(), dropped.len()), (2, 2));

        kept.sort_by_key(|roll| roll.value().unwrap().as_int());
        let lowest_kept = kept[0].value().unwrap();
        assert!(dropped.iter().all(|roll| roll.value().unwrap() <= lowest_kept));

        let sum: Number = kept.iter().filter_map(|roll| roll.value()).sum();
        assert_eq!(sum, result.total());
    }
}

#[test]
fn test_sort_is_an_idempotent_permutation() {
    for seed in 0..20 {
        let plain = roll_with("6d20", &mut seeded(seed)).unwrap();
        let sorted = roll_with("6d20s", &mut seeded(seed)).unwrap();
        let twice = roll_with("6d20s s", &mut seeded(seed)).unwrap();

        let mut expected = faces(&plain.dice_rolls());
        expected.sort_unstable();
        assert_eq!(faces(&sorted.dice_rolls()), expected);
        assert_eq!(faces(&twice.dice_rolls()), expected);
        assert_eq!(sorted.total(), plain.total());
    }
}

#[test]
fn test_fate_dice_range() {
    for seed in 0..20 {
        let result = roll_with("10dF", &mut seeded(seed)).unwrap();
        assert!(faces(&result.dice_rolls())
            .iter()
            .all(|x| [-1, 0, 1].contains(x)));
    }
}

#[test]
fn test_roll_limit_error() {
    let mut interpreter = seeded(1).with_limits(Limits::bounded(20, 100));
    let result = roll_with("50d6", &mut interpreter).unwrap();
    assert!(result.errors()[0].contains("Maximum allowed: 20"));
    assert!(result.dice_rolls().is_empty());
    assert_eq!(result.total(), Number::ZERO);
}

#[test]
fn test_huge_counts_rejected_when_bounded() {
    let mut interpreter = seeded(1).with_limits(Limits::bounded(1000, 1000));
    let result = roll_with("99999999999d6", &mut interpreter).unwrap();
    assert_eq!(
        result.errors(),
        &["Invalid number of rolls: 99999999999. Maximum allowed: 1000.".to_owned()]
    );
    assert!(result.dice_rolls().is_empty());

    let result = roll_with("{1}...99999999999", &mut interpreter).unwrap();
    assert_eq!(result.total(), Number::ZERO);
    assert_eq!(result.tree().children.len(), 0);
}

#[test]
fn test_nested_comparison_counts_outer_only() {
    let result = roll_with("(3d6 > 3) > 0", &mut Interpreter::with_roller(ConstRoller(4))).unwrap();
    assert_eq!((result.successes(), result.fails()), (1, 0));
    assert_eq!(result.total(), Number::from(1));
}

#[test]
fn test_modified_division_by_zero_reported_once() {
    let result = roll_with("{1d6 / 0}kh1", &mut Interpreter::with_roller(ConstRoller(4))).unwrap();
    assert_eq!(result.errors(), &["Division by zero.".to_owned()]);
    assert_eq!(result.total(), Number::ZERO);
}

#[test]
fn test_parsed_tree_is_reusable() {
    let parsed = parse("3d6kh2");
    assert!(parsed.is_ok());
    let pristine = parsed.root.clone();

    let mut interpreter = seeded(7);
    let first = interpreter.interpret(&parsed.root).unwrap();
    let second = interpreter.interpret(&parsed.root).unwrap();

    assert_eq!(first.dice_rolls().len(), 3);
    assert_eq!(second.dice_rolls().len(), 3);
    assert_eq!(parsed.root, pristine);
    assert!(parsed.root.value().is_none());
}

#[test]
fn test_parse_errors_are_reported_first() {
    let mut interpreter = Interpreter::with_roller(ConstRoller(4));
    let result = roll_with("1d6 / 0 + $", &mut interpreter).unwrap();
    assert_eq!(result.total(), Number::ZERO);
    assert_eq!(result.errors().len(), 2);
    assert!(result.errors()[0].starts_with("error at position 10"));
    assert_eq!(result.errors()[1], "Division by zero.");
}

#[test]
fn test_unknown_function_is_fatal() {
    assert_eq!(
        roll("nope(1)").map(|result| result.total()),
        Err(EvalError::UnknownFunction("nope".to_owned()))
    );
}

#[test]
fn test_custom_functions() {
    let functions = FunctionTable::new().with("half", |ev: &mut dyn dice_tree::roll::Evaluate, node: &mut Node| {
        let args = dice_tree::roll::evaluate_args(ev, node)?;
        Ok(args.into_iter().sum::<Number>() / Number::from(2))
    });
    let mut interpreter = Interpreter::with_roller(ConstRoller(4)).with_functions(functions);

    let result = roll_with("half(2d6) + floor(7 / 2)", &mut interpreter).unwrap();
    assert_eq!(result.total(), Number::from(7));
}

#[test]
fn test_critical_marks() {
    let result = roll_with("2d4cs", &mut Interpreter::with_roller(ConstRoller(4))).unwrap();
    assert!(result
        .dice_rolls()
        .iter()
        .all(|roll| roll.text_attr(attr::CRITICAL) == Some("success")));
}
