pub struct CaseResult {
    pub name: &'static str,
    pub error: Option<String>,
}

impl CaseResult {
    pub fn new(name: &'static str, result: anyhow::Result<()>) -> Self {
        Self {
            name,
            error: result.err().map(|e| format!("{e:#}")),
        }
    }
}

/// Print one PASS/FAIL line per case and fail if any case failed.
pub fn report(title: &str, cases: &[CaseResult]) -> anyhow::Result<()> {
    println!("=== {title} ===");

    let mut passed = 0;
    for case in cases {
        match &case.error {
            None => {
                println!("  PASS  {}", case.name);
                passed += 1;
            }
            Some(e) => println!("  FAIL  {}: {e}", case.name),
        }
    }

    let total = cases.len();
    println!();
    println!("{passed}/{total} passed");

    if passed < total {
        anyhow::bail!("{title}: {} case(s) failed", total - passed);
    }
    Ok(())
}
