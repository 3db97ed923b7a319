use std::sync::Arc;
use std::thread;

use canon_core::support::distinct_strings;
use canon_core::table::{InternTable, InternTableBuilder};
use canon_pool::SharedPool;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn criterion_benchmark(c: &mut Criterion) {
  let values = distinct_strings(10_000);

  c.bench_with_input(
    BenchmarkId::new("table distinct", values.len()),
    &values,
    |b, values| {
      b.iter(|| {
        let mut table = InternTable::new();
        for value in values {
          table.intern(value).unwrap();
        }
        table.count()
      });
    },
  );

  c.bench_with_input(
    BenchmarkId::new("table hits", values.len()),
    &values,
    |b, values| {
      let mut table = InternTable::new();
      for value in values {
        table.intern(value).unwrap();
      }

      b.iter(|| {
        let mut live = 0usize;
        for value in values {
          live += table.intern(value).unwrap().len();
        }
        live
      });
    },
  );

  c.bench_with_input(
    BenchmarkId::new("table churn", 256),
    &values,
    |b, values| {
      b.iter(|| {
        let mut table = InternTableBuilder::new().max_count(256).build().unwrap();
        for value in values {
          table.intern(value).unwrap();
        }
        table.evicted()
      });
    },
  );

  c.bench_with_input(
    BenchmarkId::new("pool distinct", values.len()),
    &values,
    |b, values| {
      b.iter(|| {
        let pool = SharedPool::new();
        for value in values {
          pool.intern(value).unwrap();
        }
        pool.stats().count
      });
    },
  );

  // shard-lock contention: several threads hammering one shared pool
  let shared_values = Arc::new(values);
  c.bench_with_input(
    BenchmarkId::new("pool contention", 4),
    &shared_values,
    |b, values| {
      b.iter(|| {
        let pool = Arc::new(SharedPool::new());

        let workers: Vec<_> = (0..4)
          .map(|_| {
            let pool = Arc::clone(&pool);
            let values = Arc::clone(values);

            thread::spawn(move || {
              for value in values.iter() {
                pool.intern(value).unwrap();
              }
            })
          })
          .collect();

        for worker in workers {
          worker.join().unwrap();
        }

        pool.stats().count
      });
    },
  );
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
