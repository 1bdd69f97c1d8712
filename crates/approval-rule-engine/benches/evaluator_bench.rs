//! 条件评估器性能基准测试
//!
//! 针对 ConditionEvaluator 的单个操作符和条件树进行细粒度的性能测试。

use approval_engine::{ComparisonValue, ConditionEvaluator, ConditionNode, FactBag, Operator, Scalar};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

/// 单个操作符基准
fn bench_operators(c: &mut Criterion) {
    let mut group = c.benchmark_group("operators");

    let number = Scalar::Number(1000.0);
    let text = Scalar::from("expense");
    let threshold = ComparisonValue::from(500);
    let same_text = ComparisonValue::from("expense");
    let list = ComparisonValue::from(vec!["travel", "loan", "expense"]);

    for operator in [
        Operator::Equal,
        Operator::NotEqual,
        Operator::LessThan,
        Operator::GreaterThanInclusive,
    ] {
        group.bench_with_input(
            BenchmarkId::new("numeric", operator.as_str()),
            &operator,
            |b, op| {
                b.iter(|| {
                    ConditionEvaluator::apply(black_box(*op), black_box(&number), black_box(&threshold))
                })
            },
        );
    }

    group.bench_function("equal_text", |b| {
        b.iter(|| {
            ConditionEvaluator::apply(
                black_box(Operator::Equal),
                black_box(&text),
                black_box(&same_text),
            )
        })
    });

    group.bench_function("in_list", |b| {
        b.iter(|| ConditionEvaluator::apply(black_box(Operator::In), black_box(&text), black_box(&list)))
    });

    group.finish();
}

/// 构建宽度为 width 的 All 条件（全部成立）
fn wide_all(width: usize) -> ConditionNode {
    ConditionNode::all(
        (0..width)
            .map(|i| ConditionNode::predicate(format!("f{}", i), Operator::LessThan, 100))
            .collect(),
    )
}

/// 构建嵌套 depth 层的条件树
fn nested(depth: usize) -> ConditionNode {
    let mut node = ConditionNode::predicate("f0", Operator::Equal, 1);
    for level in 0..depth {
        node = if level % 2 == 0 {
            ConditionNode::all(vec![node])
        } else {
            ConditionNode::any(vec![node])
        };
    }
    node
}

/// 条件树规模基准
fn bench_condition_trees(c: &mut Criterion) {
    let mut group = c.benchmark_group("condition_trees");
    let evaluator = ConditionEvaluator::new();

    for width in [1, 10, 100] {
        let node = wide_all(width);
        let facts: FactBag = (0..width).map(|i| (format!("f{}", i), Scalar::Number(1.0))).collect();
        group.bench_with_input(BenchmarkId::new("all_width", width), &width, |b, _| {
            b.iter(|| evaluator.evaluate(black_box(&node), black_box(&facts)))
        });
    }

    for depth in [2, 8, 24] {
        let node = nested(depth);
        let facts = FactBag::new().with("f0", 1);
        group.bench_with_input(BenchmarkId::new("nested_depth", depth), &depth, |b, _| {
            b.iter(|| evaluator.evaluate(black_box(&node), black_box(&facts)))
        });
    }

    // 首个子节点即短路
    let node = ConditionNode::any(
        std::iter::once(ConditionNode::all(vec![]))
            .chain((0..100).map(|i| ConditionNode::predicate(format!("f{}", i), Operator::Equal, 1)))
            .collect(),
    );
    let facts = FactBag::new();
    group.bench_function("any_short_circuit", |b| {
        b.iter(|| evaluator.evaluate(black_box(&node), black_box(&facts)))
    });

    group.finish();
}

criterion_group!(benches, bench_operators, bench_condition_trees);
criterion_main!(benches);
