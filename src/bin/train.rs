use anyhow::Error;
use rs_asl_pipeline::config::config::TrainerConfig;
use rs_asl_pipeline::dataset::dataset::Dataset;
use rs_asl_pipeline::trainer::trainer::Trainer;

fn main() -> Result<(), Error> {
    env_logger::init();

    let config = TrainerConfig::new();

    println!("Loading data from {:?}...", config.dataset_path);
    let dataset = Dataset::load_json(&config.dataset_path)?;

    let summary = dataset.summary();
    println!("\nDataset Statistics:");
    println!("Total samples: {}", summary.total_samples);
    println!("Number of users: {}", summary.unique_users);
    println!("Number of letters: {}", summary.unique_labels);
    println!("Samples per letter:");
    for (label, count) in dataset.label_counts() {
        println!("  {}: {} samples", label, count);
    }

    println!("\nTraining model...");
    let trainer = Trainer::new(config.clone());
    let (artifact, report) = trainer.train(&dataset)?;

    println!("\nResults:");
    println!(
        "{:.2}% of samples were classified correctly!",
        report.accuracy * 100.0
    );
    println!("\nDetailed Classification Report:");
    println!("{}", report.render());

    println!("Per-user accuracy:");
    for (user, accuracy) in &report.per_user_accuracy {
        println!("{}: {:.2}%", user, accuracy * 100.0);
    }

    println!("\nSaving model to {:?}...", config.model_path);
    artifact.save_json(&config.model_path)?;
    println!("Model saved successfully!");

    Ok(())
}
