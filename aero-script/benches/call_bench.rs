use criterion::{black_box, criterion_group, criterion_main, Criterion};

use aero_script::lua::{CallResult, Context, Value};
use aero_script::script::{FunctionParameterType as F, Parameter, ParameterType as T};

fn bench_call(c: &mut Criterion) {
    let ctx = Context::new();
    let add = ctx.load_source("return function(a, b) return a + b end").unwrap();
    let CallResult::Single(Value::Function(add)) = ctx.call(&add, &[]).unwrap() else {
        panic!("chunk did not return a function");
    };
    let spread = ctx.load_source("return 1, 'two', true, nil, 5").unwrap();

    let mut g = c.benchmark_group("call");
    g.bench_function("script_add", |b| {
        let args = [Value::Number(1.0), Value::Number(2.0)];
        b.iter(|| ctx.call(black_box(&add), black_box(&args)).unwrap())
    });
    g.bench_function("script_multiple_results", |b| {
        b.iter(|| ctx.call(black_box(&spread), &[]).unwrap())
    });
    g.finish();
}

fn bench_validate(c: &mut Criterion) {
    let ctx = Context::new();
    let unchecked = ctx
        .create_function("unchecked", None, |_| Ok(CallResult::NoValue))
        .unwrap();
    let scalars = ctx
        .create_function(
            "scalars",
            Some(vec![F::STRING, F::NUMBER, F::variadic(Parameter::one_of([T::STRING, T::FUNCTION]))]),
            |_| Ok(CallResult::NoValue),
        )
        .unwrap();
    let options = ctx
        .create_function(
            "options",
            Some(vec![F::schema([
                ("appId", Parameter::optional(T::STRING)),
                ("workspace", Parameter::optional(T::STRING)),
                ("checkFurtherCallbacks", Parameter::optional(T::BOOLEAN)),
            ])]),
            |_| Ok(CallResult::NoValue),
        )
        .unwrap();
    let make_opts = ctx.load_source("return { appId = 'com.example', checkFurtherCallbacks = true }").unwrap();
    let CallResult::Single(opts) = ctx.call(&make_opts, &[]).unwrap() else {
        panic!("chunk did not return a table");
    };

    let scalar_args = [Value::from("mode"), Value::Number(3.0), Value::from("a"), Value::from("b")];
    let table_args = [opts];

    let mut g = c.benchmark_group("validate");
    g.bench_function("baseline_no_schema", |b| {
        b.iter(|| ctx.call(black_box(&unchecked), black_box(&scalar_args)).unwrap())
    });
    g.bench_function("scalars_and_variadic", |b| {
        b.iter(|| ctx.call(black_box(&scalars), black_box(&scalar_args)).unwrap())
    });
    g.bench_function("table_schema", |b| {
        b.iter(|| ctx.call(black_box(&options), black_box(&table_args)).unwrap())
    });
    g.finish();
}

criterion_group!(benches, bench_call, bench_validate);
criterion_main!(benches);
