#![allow(clippy::unwrap_used)]

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use minischeme::{evaluator, parser};

const SIMPLE: &str = "(+ 1 2)";
const NESTED: &str = "(if (> (* 5 2) 8) (+ 10 5 20) 0)";
const DOTTED: &str = "(a b c . (1 2 . tail))";

// Recursive factorial through a named define
const FACTORIAL_DEF: &str = "(define (fact n) (if (= n 0) 1 (* n (fact (- n 1)))))";
const FACTORIAL_CALL: &str = "(fact 10)";

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Parsing");

    group.bench_function("Simple", |b| b.iter(|| parser::parse(black_box(SIMPLE))));
    group.bench_function("Nested", |b| b.iter(|| parser::parse(black_box(NESTED))));
    group.bench_function("Dotted", |b| b.iter(|| parser::parse(black_box(DOTTED))));
    group.bench_function("Program", |b| {
        b.iter(|| parser::parse_all(black_box(FACTORIAL_DEF)))
    });

    group.finish();
}

fn bench_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Evaluation");

    let env = evaluator::create_global_env();
    let simple = parser::parse(SIMPLE).unwrap();
    let nested = parser::parse(NESTED).unwrap();
    evaluator::eval(&parser::parse(FACTORIAL_DEF).unwrap(), &env).unwrap();
    let factorial_call = parser::parse(FACTORIAL_CALL).unwrap();

    group.bench_function("Eval Simple", |b| {
        b.iter(|| evaluator::eval(black_box(&simple), &env))
    });
    group.bench_function("Eval Nested", |b| {
        b.iter(|| evaluator::eval(black_box(&nested), &env))
    });
    group.bench_function("Eval Factorial", |b| {
        b.iter(|| evaluator::eval(black_box(&factorial_call), &env))
    });

    group.finish();
}

criterion_group!(benches, bench_parsing, bench_evaluation);
criterion_main!(benches);
