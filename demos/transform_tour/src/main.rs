use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use prism::prelude::*;
use prism_core::PrismConfig;
use prism_services::diagnostics::{hub, TraceLevel};

fn main() -> Result<()> {
    prism::init_with_config(&PrismConfig::default()).context("initializing prism")?;

    println!("Prism Transform Tour");
    println!("====================");

    matrices()?;
    rectangles()?;
    diagnostics();
    resilience()?;
    shared_resources()?;

    println!("\nTour completed successfully!");
    Ok(())
}

fn matrices() -> Result<()> {
    println!("\n1. Classified matrices:");

    let mut m = Matrix::identity();
    m.translate(10.0, 20.0);
    println!("   translate(10, 20)        -> {} [{:?}]", m, m.kind());
    m.scale(2.0, 3.0);
    println!("   then scale(2, 3)         -> {} [{:?}]", m, m.kind());
    m.rotate(90.0);
    println!("   then rotate(90)          -> {} [{:?}]", m, m.kind());

    let p = m.transform_point(Point::new(1.0, 1.0));
    println!("   (1, 1) maps to           -> ({:.3}, {:.3})", p.x, p.y);

    let inverse = m.inverse().context("rotation-scale matrix should invert")?;
    let back = inverse.transform_point(p);
    println!("   and back again           -> ({:.3}, {:.3})", back.x, back.y);

    let mut singular = Matrix::scaling(0.0, 1.0);
    match singular.invert() {
        Ok(()) => bail!("a zero-scale matrix must not invert"),
        Err(e) => println!("   scale(0, 1).invert()     -> {}", e),
    }

    let parsed: Matrix = "1,0,0,1,12,23".parse()?;
    println!("   parsed \"1,0,0,1,12,23\"   -> {:?}", parsed.kind());
    Ok(())
}

fn rectangles() -> Result<()> {
    println!("\n2. Rectangles through transforms:");

    let rect = Rect::new(0.0, 0.0, 100.0, 50.0)?;
    let rotated = rect.transform(&Matrix::rotation_at(45.0, 50.0, 25.0));
    println!("   {:?}", rect);
    println!("   rotated 45 about center  -> {:?}", rotated);

    let scaled = rect.transform(&Matrix::scaling(-1.0, 2.0));
    println!("   mirrored, doubled height -> {:?}", scaled);
    Ok(())
}

fn diagnostics() {
    println!("\n3. Buffered diagnostics:");

    let hub = hub();
    hub.publish(DiagnosticEvent::ResourceDictionaryLoaded {
        source: "themes/generic.xaml".to_string(),
    });
    hub.publish(DiagnosticEvent::BindingFailed {
        code: 40,
        level: TraceLevel::Error,
        message: "property not found on source".to_string(),
        params: vec!["Title".to_string()],
    });
    println!("   pending before subscribe -> {}", hub.pending_len());

    let subscription = hub.subscribe(|record| {
        println!("   [{}] {:?}", record.recorded_at.format("%H:%M:%S"), record.event);
    });
    hub.publish(DiagnosticEvent::StaticResourceResolved {
        key: "AccentBrush".to_string(),
        source: "themes/generic.xaml".to_string(),
    });
    drop(subscription);
    println!("   pending after subscribe  -> {}", hub.pending_len());
}

#[derive(Debug)]
enum BackendFault {
    Disconnected,
}

impl std::fmt::Display for BackendFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendFault::Disconnected => write!(f, "backend disconnected"),
        }
    }
}

impl std::error::Error for BackendFault {}

fn resilience() -> Result<()> {
    println!("\n4. Reinitialize and retry:");

    let policy = RetryPolicy::new()
        .retry_on("disconnected", |e: &BackendFault| matches!(e, BackendFault::Disconnected));
    let service = ResilientService::new("speller", || Ok(Vec::<String>::new()), policy)?;

    let mut first_call = true;
    let words = service.call(|dictionary| {
        if first_call {
            first_call = false;
            return Err(BackendFault::Disconnected);
        }
        dictionary.push("prism".to_string());
        Ok(dictionary.len())
    })?;
    println!(
        "   call succeeded with {} word(s) after {} reinit(s)",
        words,
        service.reinit_count()
    );
    Ok(())
}

fn shared_resources() -> Result<()> {
    println!("\n5. Shared resources:");

    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();
    let engine: SharedResource<String, BackendFault> = SharedResource::new("engine", move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("engine #{}", n))
    });

    let a = engine.acquire()?;
    let b = engine.acquire()?;
    println!("   {} shared by {} contexts", *a, engine.active_contexts());

    engine.release();
    let c = engine.acquire()?;
    println!(
        "   after release: old contexts hold '{}', new one holds '{}'",
        *b, *c
    );
    println!("   resources created: {}", created.load(Ordering::SeqCst));
    Ok(())
}
