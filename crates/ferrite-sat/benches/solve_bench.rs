//! Small solve benchmarks: a pigeonhole refutation and a satisfiable
//! random 3-SAT instance near the phase transition.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ferrite_sat::{Literal, SolveResult, Solver, Variable};

fn lit(code: i32) -> Literal {
    Variable(code.unsigned_abs() - 1).literal(code > 0)
}

fn pigeonhole_clauses(pigeons: u32, holes: u32) -> Vec<Vec<i32>> {
    let var = |p: u32, h: u32| (p * holes + h + 1) as i32;
    let mut clauses = Vec::new();
    for p in 0..pigeons {
        clauses.push((0..holes).map(|h| var(p, h)).collect());
    }
    for h in 0..holes {
        for p1 in 0..pigeons {
            for p2 in p1 + 1..pigeons {
                clauses.push(vec![-var(p1, h), -var(p2, h)]);
            }
        }
    }
    clauses
}

fn random_3sat(vars: u32, clauses: u32, mut state: u64) -> Vec<Vec<i32>> {
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 33) as u32
    };
    let mut out = Vec::new();
    for _ in 0..clauses {
        let mut clause: Vec<i32> = Vec::new();
        while clause.len() < 3 {
            let v = next() % vars + 1;
            let sign = if next() % 2 == 0 { 1 } else { -1 };
            let code = sign * v as i32;
            if !clause.contains(&code) && !clause.contains(&-code) {
                clause.push(code);
            }
        }
        out.push(clause);
    }
    out
}

fn solve(num_vars: usize, clauses: &[Vec<i32>]) -> SolveResult {
    let mut solver = Solver::new();
    solver.new_vars(num_vars);
    for clause in clauses {
        let lits: Vec<Literal> = clause.iter().map(|&c| lit(c)).collect();
        if !solver.add_clause(&lits).unwrap() {
            return SolveResult::Unsat;
        }
    }
    solver.solve().unwrap()
}

fn bench_solve(c: &mut Criterion) {
    let php = pigeonhole_clauses(6, 5);
    c.bench_function("php_6_5_unsat", |b| {
        b.iter(|| {
            let result = solve(30, black_box(&php));
            assert_eq!(result, SolveResult::Unsat);
        })
    });

    let rand = random_3sat(150, 600, 0xfe44);
    c.bench_function("random_3sat_150", |b| {
        b.iter(|| {
            black_box(solve(150, black_box(&rand)));
        })
    });
}

criterion_group!(benches, bench_solve);
criterion_main!(benches);
