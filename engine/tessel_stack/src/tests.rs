use std::sync::Arc;

use super::*;

type Step = Arc<dyn Fn(u64) -> u64 + Send + Sync>;

#[test]
fn passes_result_through() {
    assert_eq!(ensure_sufficient_stack(|| 7), 7);

    let result: Result<u8, &str> = ensure_sufficient_stack(|| Err("boom"));
    assert_eq!(result, Err("boom"));
}

#[test]
fn deep_direct_recursion() {
    fn depth(n: u64) -> u64 {
        ensure_sufficient_stack(|| if n == 0 { 0 } else { depth(n - 1) + 1 })
    }

    assert_eq!(depth(200_000), 200_000);
}

#[test]
fn deep_recursion_through_closures() {
    // Mirrors an artifact forwarding to itself through a shared cell.
    fn make() -> Step {
        let cell: Arc<std::sync::OnceLock<Step>> = Arc::new(std::sync::OnceLock::new());
        let inner = Arc::clone(&cell);
        let step: Step = Arc::new(move |n| {
            if n == 0 {
                return 0;
            }
            let next = inner.get().map_or(0, |f| ensure_sufficient_stack(|| f(n - 1)));
            next + 1
        });
        let _ = cell.set(Arc::clone(&step));
        step
    }

    let f = make();
    assert_eq!(f(100_000), 100_000);
}

