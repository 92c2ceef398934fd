//! Example verifying an LLM-written budget summary.
//!
//! Extracts every figure from a narrative, checks it against the budget
//! context, reports unknown entities and prints the corrected text.
//!
//! # Running the example
//!
//! ```bash
//! cargo run --example verify_narrative
//! cargo run --example verify_narrative --features smt
//! ```

use std::sync::Arc;

use tokio::sync::RwLock;

use oxiverify::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== OxiVerify Narrative Example ===\n");

    let context = BudgetContext::new()
        .with_total(2_450.00)
        .with_entry_count(64)
        .with_category("Dining", 420.00)
        .with_category("Groceries", 610.00)
        .with_category("Transport", 180.00)
        .with_project("Kitchen Remodel", 1_240.00)
        .with_merchant("Starbucks", 38.50)
        .with_month("2024-04", 2_200.00)
        .with_month("2024-05", 2_450.00);

    let embeddings = EmbeddingService::cached(
        MockEmbeddingProvider::new(384),
        EmbeddingCacheConfig::default(),
    );

    // Knowledge graph seeded from known merchants, plus one user correction.
    let graph = Arc::new(RwLock::new(KnowledgeGraph::from_pairs([
        ("Starbucks", "Dining"),
        ("Shell", "Transport"),
    ])?));
    let model = Arc::new(
        MockCategoryModel::new()
            .with_prediction("Peets Coffee", "Groceries", 0.41)
            .with_fallback("Misc", 0.2),
    );
    let reasoner = HybridReasoner::new(model)
        .with_graph(graph)
        .with_embeddings(embeddings.clone());
    if let Some(learner) = reasoner.learner() {
        learner.learn_feedback("Peets Coffee", "Dining").await?;
    }
    reasoner.train_gnn().await?;

    let rules = RuleSet::new().with_rule("uber", "Transport");
    let refined = reasoner.refine_prediction("Peets Coffee", &rules).await?;
    let proof = ProofGenerator::new().generate_proof(&refined);
    println!("Categorised 'Peets Coffee' as {} ({})", proof.conclusion, refined.source.as_str());
    for step in &proof.steps {
        println!("  - {step}");
    }

    let orchestrator = VerificationOrchestrator::builder()
        .with_embeddings(embeddings)
        .with_reasoner(Arc::new(reasoner))
        .build()?;

    let text = "This month you spent $420.00 on Dining and $650.00 on Groceries. \
                Overall spending was up 11.4% on the previous month, with a total of $2,450.00. \
                Netflix spending was high.";

    let result = orchestrator.verify_response(text, &context).await;

    println!("\n{}", explain(text, &result));
    println!("Metrics: {}", serde_json::to_string_pretty(&result.metrics)?);

    Ok(())
}
