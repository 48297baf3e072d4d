//! Basic usage example for the ramper crate.
//!
//! Drives the bucket by hand with `tick()` so the ramp is visible without
//! waiting on the 10 second refill cadence.

use ramper::{AdaptiveBucketBuilder, AdaptiveTokenBucket, ConfigurationError, RampDirection};

fn main() {
    println!("=== Adaptive Token Bucket Example ===\n");

    // Example 1: Construction and validation
    construction_example();

    println!("{}", "\n".to_owned() + "=".repeat(50).as_str() + "\n");

    // Example 2: Cold start and depletion
    depletion_example();

    println!("{}", "\n".to_owned() + "=".repeat(50).as_str() + "\n");

    // Example 3: Ramping up under demand, back down when idle
    ramp_example();

    println!("{}", "\n".to_owned() + "=".repeat(50).as_str() + "\n");

    // Example 4: Monitoring metrics
    metrics_example();
}

fn construction_example() {
    println!("1. Construction:");

    for (max, ramp) in [(100, 1), (100, 0), (-1, 5), (100, -1)] {
        match AdaptiveTokenBucket::new(max, ramp) {
            Ok(bucket) => println!(
                "   new({}, {}) -> capacity {}, ramp step {}",
                max,
                ramp,
                bucket.current_capacity(),
                bucket.ramp_step()
            ),
            Err(err) => report(max, ramp, err),
        }
    }
}

fn report(max: i64, ramp: i64, err: ConfigurationError) {
    println!("   new({}, {}) -> ❌ {} [{}]", max, ramp, err, err.parameter());
}

fn depletion_example() {
    println!("2. Cold Start and Depletion:");

    let bucket = match AdaptiveTokenBucket::new(20, 1) {
        Ok(bucket) => bucket,
        Err(err) => {
            eprintln!("   {}", err);
            return;
        }
    };
    println!(
        "   Max 20/min starts at {} tokens (10%)",
        bucket.current_capacity()
    );

    for i in 1..=3 {
        if bucket.accept() {
            println!("   Request {} - ✅ Accepted", i);
        } else {
            println!("   Request {} - ❌ Rejected", i);
        }
    }
}

fn ramp_example() {
    println!("3. Ramping:");

    let bucket = match AdaptiveBucketBuilder::new()
        .max_capacity(100)
        .ramp_period_minutes(1)
        .build()
    {
        Ok(bucket) => bucket,
        Err(err) => {
            eprintln!("   {}", err);
            return;
        }
    };

    println!("   Sustained demand (bucket drained before every tick):");
    for tick in 1..=8 {
        let mut served = 0;
        while bucket.accept() {
            served += 1;
        }
        let outcome = bucket.tick();
        println!(
            "   tick {:>2}: served {:>3}, capacity {:>3} -> {:>3} {}",
            tick,
            served,
            outcome.previous_capacity,
            outcome.capacity,
            arrow(outcome.direction)
        );
    }

    println!("   Demand stops:");
    for tick in 9..=14 {
        let outcome = bucket.tick();
        println!(
            "   tick {:>2}: capacity {:>3} -> {:>3} {}",
            tick,
            outcome.previous_capacity,
            outcome.capacity,
            arrow(outcome.direction)
        );
    }
}

fn metrics_example() {
    println!("4. Monitoring and Metrics:");

    let bucket = match AdaptiveTokenBucket::new(600, 5) {
        Ok(bucket) => bucket,
        Err(err) => {
            eprintln!("   {}", err);
            return;
        }
    };

    // Offer 100 requests per tick for a minute
    for _ in 0..6 {
        for _ in 0..100 {
            bucket.accept();
        }
        bucket.tick();
    }

    let metrics = bucket.metrics();
    println!("{}", metrics.summary());

    let health = metrics.health_status();
    println!("   - Health status: {}", health);
    println!("   - Suggested action: {}", health.suggested_action());
}

fn arrow(direction: RampDirection) -> &'static str {
    match direction {
        RampDirection::Up => "↑",
        RampDirection::Down => "↓",
        RampDirection::Hold => "=",
    }
}
