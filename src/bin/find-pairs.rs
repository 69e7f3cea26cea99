extern crate serde;
extern crate serde_json;

use basepair::registry::Registry;
use basepair::report::{JsonlRecorder, NullRecorder, Recorder};
use basepair::structure::Structure;
use basepair::templates::TemplateStore;
use basepair::{PairParams, Pipeline};
use serde_json::json;
use std::env;
use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

fn read_params_from_file<P: AsRef<Path>>(path: P) -> Result<PairParams, Box<dyn Error>> {
    // Open the file in read-only mode with buffer.
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let params = serde_json::from_reader(reader)?;
    Ok(params)
}

fn main() {
    env_logger::init();
    // Parse command line
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 4 {
        println!(
            "Wrong command line. Usage: {} structure.[pdb|cif] [params.json] [events.jsonl]",
            args[0]
        );
        return;
    }

    let structure_path = Path::new(&args[1]);
    let params = if args.len() >= 3 {
        match read_params_from_file(&args[2]) {
            Ok(params) => params,
            Err(why) => {
                eprintln!("Error reading parameters {}: {}", args[2], why);
                return;
            }
        }
    } else {
        PairParams::default()
    };

    println!("Reading input structure: {}", args[1]);
    let mut structure = match Structure::from_path(structure_path) {
        Ok(structure) => structure,
        Err(why) => {
            eprintln!("Error: {why}");
            return;
        }
    };

    let registry = match Registry::load_default() {
        Ok(registry) => registry,
        Err(why) => {
            eprintln!("Error: {why}");
            return;
        }
    };
    println!("Registry holds {} modified nucleotides", registry.len());

    let mut recorder: Box<dyn Recorder> = if args.len() == 4 {
        match File::create(&args[3]) {
            Ok(file) => Box::new(JsonlRecorder::new(file)),
            Err(why) => {
                eprintln!("Error creating {}: {}", args[3], why);
                return;
            }
        }
    } else {
        Box::new(NullRecorder)
    };

    let templates = TemplateStore::with_default_dir();
    let mut pipeline = Pipeline::with_params(&registry, templates, params);
    let analysis = match pipeline.run_with(&mut structure, None, recorder.as_mut()) {
        Ok(analysis) => analysis,
        Err(why) => {
            eprintln!("Error: {why}");
            return;
        }
    };

    let pairs: Vec<serde_json::Value> = analysis
        .pairs
        .iter()
        .map(|pair| {
            json!({
                "i": pair.i,
                "j": pair.j,
                "ident_i": structure.residue(pair.i).ident(),
                "ident_j": structure.residue(pair.j).ident(),
                "letters": pair.letters,
                "quality": pair.quality,
                "bp_type": pair.result.bp_type.legacy_id(),
                "dorg": pair.result.dorg,
                "dnn": pair.result.dnn,
                "plane_angle": pair.result.plane_angle,
                "hbonds": pair.result.hbonds,
            })
        })
        .collect();

    let steps: Vec<serde_json::Value> = analysis
        .steps
        .iter()
        .map(|record| {
            json!({
                "from": record.from_pair,
                "to": record.to_pair,
                "shift": record.step.shift,
                "slide": record.step.slide,
                "rise": record.step.rise,
                "tilt": record.step.tilt,
                "roll": record.step.roll,
                "twist": record.step.twist,
                "helical": record.helical,
            })
        })
        .collect();

    let output = json!({
        "report": analysis.report,
        "pairs": pairs,
        "helices": analysis.ordering.helices(),
        "steps": steps,
    });
    println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
}
