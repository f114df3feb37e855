use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use log::info;
use mine_eval::annotations::bounding_box::BoundingBoxGeometry;
use mine_eval::config::{DetectorSettings, EvalConfig};
use mine_eval::evaluation::detection_normalizer::DetectionNormalizer;
use mine_eval::evaluation::metrics::analyze_records;
use mine_eval::evaluation::pipeline::{Evaluation, evaluate_and_save, run_detector};
use mine_eval::evaluation::result_store::ResultStore;
use mine_eval::geo::raster_metadata::GeoTiffMetadata;
use mine_eval::image_utils::annotate::draw_detections;
use mine_eval::image_utils::image_io::read_image_as_rgb8;
use mine_eval::object_detection::object_detection_model::ObjectDetectionModel;
use mine_eval::object_detection::object_detection_utils::collect_images;
use mine_eval::object_detection::yolo_txt_predictions::YoloTxtPredictions;
use mine_eval::visualization::detection_map::DetectionMap;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, env = "MINE_EVAL_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the detector over the test split and write the result document.
    Evaluate(EvaluateArgs),
    /// Print precision, recall, F1 and probability statistics from the result document.
    Analyze(AnalyzeArgs),
    /// Draw the detected mines of the result document on a web map.
    Map(MapArgs),
    /// Evaluate, analyze and map in one go.
    Run(RunArgs),
    /// Detect mines in a single image.
    Detect(DetectArgs),
}

#[derive(Args, Debug)]
struct DetectorArgs {
    /// Directory of YOLO txt predictions (class x y w h conf).
    #[arg(long)]
    predictions: Option<PathBuf>,
    /// ONNX model to run instead of reading predictions.
    #[arg(long)]
    model: Option<PathBuf>,
    /// Minimum confidence for a box to count.
    #[arg(long)]
    confidence: Option<f64>,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Dataset root holding test/images and test/labels.
    #[arg(long)]
    dataset: Option<PathBuf>,
    /// Where to write the result document.
    #[arg(long)]
    results: Option<PathBuf>,
    #[command(flatten)]
    detector: DetectorArgs,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Result document to read.
    #[arg(long)]
    results: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct MapArgs {
    /// Result document to read.
    #[arg(long)]
    results: Option<PathBuf>,
    /// HTML file to write.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    evaluate: EvaluateArgs,
    /// HTML file to write.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DetectArgs {
    /// Image to run the detector on.
    image: PathBuf,
    /// Write a copy of the image with the detections outlined.
    #[arg(long)]
    annotated: Option<PathBuf>,
    #[command(flatten)]
    detector: DetectorArgs,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let mut cfg = EvalConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Evaluate(args) => {
            apply_evaluate_args(&mut cfg, args)?;
            evaluate(&cfg)?;
        }
        Command::Analyze(args) => {
            if let Some(results) = args.results {
                cfg.result_path = results;
            }
            analyze(&cfg)?;
        }
        Command::Map(args) => {
            if let Some(results) = args.results {
                cfg.result_path = results;
            }
            if let Some(output) = args.output {
                cfg.map_output = output;
            }
            render_map(&cfg)?;
        }
        Command::Run(args) => {
            apply_evaluate_args(&mut cfg, args.evaluate)?;
            if let Some(output) = args.output {
                cfg.map_output = output;
            }
            let evaluation = evaluate(&cfg)?;
            if !evaluation.records.is_empty() {
                analyze(&cfg)?;
                render_map(&cfg)?;
            }
        }
        Command::Detect(args) => {
            apply_detector_args(&mut cfg.detector, args.detector);
            cfg.validate()?;
            detect_single(&cfg.detector, &args.image, args.annotated.as_deref())?;
        }
    }
    Ok(())
}

fn apply_detector_args(settings: &mut DetectorSettings, args: DetectorArgs) {
    if let Some(predictions) = args.predictions {
        settings.predictions_dir = predictions;
        settings.model_path = None;
    }
    if let Some(model) = args.model {
        settings.model_path = Some(model);
    }
    if let Some(confidence) = args.confidence {
        settings.confidence = confidence;
    }
}

fn apply_evaluate_args(cfg: &mut EvalConfig, args: EvaluateArgs) -> Result<()> {
    if let Some(dataset) = args.dataset {
        cfg.dataset_root = dataset;
    }
    if let Some(results) = args.results {
        cfg.result_path = results;
    }
    apply_detector_args(&mut cfg.detector, args.detector);
    cfg.validate()
}

fn build_detector(settings: &DetectorSettings) -> Result<Box<dyn ObjectDetectionModel>> {
    match &settings.model_path {
        Some(model_path) => onnx_detector(model_path, settings),
        None => Ok(Box::new(YoloTxtPredictions::new(
            settings.predictions_dir.clone(),
            settings.confidence,
        ))),
    }
}

#[cfg(feature = "onnx")]
fn onnx_detector(
    model_path: &Path,
    settings: &DetectorSettings,
) -> Result<Box<dyn ObjectDetectionModel>> {
    use mine_eval::object_detection::yolov11_bounding_box::Yolov11BoundingBox;

    let model = Yolov11BoundingBox::new(
        model_path,
        settings.input_width,
        settings.input_height,
        settings.confidence as f32,
        settings.iou_threshold,
    )
    .map_err(|e| anyhow!("failed to load model {}: {}", model_path.display(), e))?;
    Ok(Box::new(model))
}

#[cfg(not(feature = "onnx"))]
fn onnx_detector(
    model_path: &Path,
    _settings: &DetectorSettings,
) -> Result<Box<dyn ObjectDetectionModel>> {
    Err(anyhow!(
        "cannot run {}: built without the `onnx` feature",
        model_path.display()
    ))
}

fn evaluate(cfg: &EvalConfig) -> Result<Evaluation> {
    let images_dir = cfg.test_images_dir();
    let images = collect_images(&images_dir)
        .with_context(|| format!("failed to list images in {}", images_dir.display()))?;
    info!("Found {} test images in {}", images.len(), images_dir.display());

    let mut detector = build_detector(&cfg.detector)?;
    let (batch, failed_images) = run_detector(detector.as_mut(), &images);
    let normalizer = DetectionNormalizer::new(&cfg.dataset_root, GeoTiffMetadata);
    let store = ResultStore::new(&cfg.result_path);
    let evaluation = evaluate_and_save(&normalizer, &batch, failed_images, &store)?;

    if evaluation.records.is_empty() {
        println!("No results to evaluate.");
    } else {
        println!(
            "Evaluation details for {} records saved to {}",
            evaluation.records.len(),
            store.path().display()
        );
    }
    for failure in &evaluation.failed_images {
        println!("Skipped {}: {}", failure.image_path.display(), failure.reason);
    }
    Ok(evaluation)
}

fn analyze(cfg: &EvalConfig) -> Result<()> {
    let records = ResultStore::new(&cfg.result_path).load()?;
    let report = analyze_records(&records);
    println!("{report}");
    Ok(())
}

fn render_map(cfg: &EvalConfig) -> Result<()> {
    let records = ResultStore::new(&cfg.result_path).load()?;
    let mut map = DetectionMap::new(cfg.map.center, cfg.map.zoom);
    map.add_records(&records);
    map.save(&cfg.map_output)?;
    println!("Map with detected mines saved to {}", cfg.map_output.display());
    Ok(())
}

fn detect_single(settings: &DetectorSettings, image: &Path, annotated: Option<&Path>) -> Result<()> {
    let mut detector = build_detector(settings)?;
    let detections: Vec<_> = detector
        .detect(image)?
        .into_iter()
        .filter(|d| d.is_target())
        .collect();

    if detections.is_empty() {
        println!("NO MINE DETECTED");
    }
    for detection in &detections {
        let (x1, y1, x2, y2) = detection.annotation.as_xyxy();
        println!(
            "MINE DETECTED - Confidence: {:.2}, Box: ({:.0}, {:.0}, {:.0}, {:.0})",
            detection.confidence, x1, y1, x2, y2
        );
    }

    if let Some(output) = annotated {
        let mut rgb_image = read_image_as_rgb8(image)?;
        draw_detections(&mut rgb_image, &detections);
        rgb_image
            .save(output)
            .with_context(|| format!("failed to write {}", output.display()))?;
        println!("Annotated image saved to {}", output.display());
    }
    Ok(())
}
