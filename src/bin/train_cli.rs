#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(err) = native::run() {
        eprintln!("train_cli error: {err}");
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::fs;
    use std::path::{Path, PathBuf};

    use train_driver::Engine;

    const USAGE: &str = r"train_cli (train-driver)

USAGE:
  train_cli place <doc.xml> [--train <name>]
  train_cli add-car <doc.xml> [--train <name>] [--count <n>] [--out <path>]

COMMANDS:
  place      Place the cars of one or all trains and print status and transforms
  add-car    Append cars to a train and write the document back

OPTIONS:
  --train <name>   Train to work on (required for add-car when the document has several)
  --count <n>      Number of cars to append (default 1)
  --out <path>     Write the document here instead of over the input
  -h, --help       Show this help
";

    pub fn run() -> Result<(), String> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let mut args = Args::new(args);

        let Some(command) = args.next() else {
            print_usage();
            return Ok(());
        };

        match command.as_str() {
            "place" => cmd_place(&mut args),
            "add-car" => cmd_add_car(&mut args),
            "-h" | "--help" | "help" => {
                print_usage();
                Ok(())
            }
            other => Err(format!("unknown command `{other}`\n\n{USAGE}")),
        }
    }

    fn print_usage() {
        println!("{USAGE}");
    }

    fn cmd_place(args: &mut Args) -> Result<(), String> {
        let path = PathBuf::from(args.next().ok_or("missing document path")?);
        let mut train: Option<String> = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--train" => train = Some(args.value("--train")?),
                other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
            }
        }

        let mut engine = load_engine(&path)?;
        let trains = match train {
            Some(name) => vec![name],
            None => train_names(&engine),
        };
        if trains.is_empty() {
            return Err(format!("{} contains no trains", path.display()));
        }

        for name in trains {
            train_driver::debug_log!("placing train {name}");
            if let Err(err) = engine.place_train(&name) {
                eprintln!("{name}: {err}");
            }
            let status = engine.train_status(&name).map_err(|e| e.to_string())?;
            println!("== {name}");
            println!("{status}");

            for node in engine.transforms(&name).map_err(|e| e.to_string())? {
                let origin = [node.matrix[0][3], node.matrix[1][3], node.matrix[2][3]];
                println!(
                    "  {:<12} {:<10} origin ({:.3}, {:.3}, {:.3}) scale ({:.3}, {:.3}, {:.3})",
                    node.car, node.name, origin[0], origin[1], origin[2], node.scale[0], node.scale[1], node.scale[2]
                );
            }
        }
        Ok(())
    }

    fn cmd_add_car(args: &mut Args) -> Result<(), String> {
        let path = PathBuf::from(args.next().ok_or("missing document path")?);
        let mut train: Option<String> = None;
        let mut count: usize = 1;
        let mut out: Option<PathBuf> = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--train" => train = Some(args.value("--train")?),
                "--count" => {
                    let raw = args.value("--count")?;
                    count = raw
                        .parse()
                        .map_err(|e| format!("invalid --count `{raw}`: {e}"))?;
                }
                "--out" => out = Some(PathBuf::from(args.value("--out")?)),
                other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
            }
        }

        let mut engine = load_engine(&path)?;
        let train = match train {
            Some(name) => name,
            None => single_train(&engine, &path)?,
        };

        for _ in 0..count {
            let car = engine.append_car(&train).map_err(|e| e.to_string())?;
            println!("added {car} to {train}");
        }
        if let Err(err) = engine.place_train(&train) {
            println!("placement after adding cars failed: {err}");
        }

        let xml = engine.export().map_err(|e| e.to_string())?;
        let target = out.as_deref().unwrap_or(&path);
        write_text_file(target, &xml)?;
        println!("wrote {}", target.display());
        Ok(())
    }

    fn load_engine(path: &Path) -> Result<Engine, String> {
        let xml = fs::read_to_string(path).map_err(|e| format!("read {}: {e}", path.display()))?;
        let mut engine = Engine::new();
        engine.load(&xml).map_err(|e| format!("load {}: {e}", path.display()))?;
        Ok(engine)
    }

    fn train_names(engine: &Engine) -> Vec<String> {
        engine
            .scene()
            .map(|scene| {
                scene
                    .trains()
                    .filter_map(|id| scene.name(id).map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn single_train(engine: &Engine, path: &Path) -> Result<String, String> {
        let mut names = train_names(engine);
        match names.len() {
            1 => Ok(names.remove(0)),
            0 => Err(format!("{} contains no trains", path.display())),
            _ => Err(format!(
                "{} contains several trains ({}); pick one with --train",
                path.display(),
                names.join(", ")
            )),
        }
    }

    fn write_text_file(path: &Path, text: &str) -> Result<(), String> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| format!("create dir {}: {e}", parent.display()))?;
        }
        fs::write(path, text).map_err(|e| format!("write {}: {e}", path.display()))
    }

    struct Args {
        args: Vec<String>,
        pos: usize,
    }

    impl Args {
        fn new(args: Vec<String>) -> Self {
            Self { args, pos: 0 }
        }

        fn next(&mut self) -> Option<String> {
            let arg = self.args.get(self.pos)?.clone();
            self.pos += 1;
            Some(arg)
        }

        fn value(&mut self, flag: &str) -> Result<String, String> {
            self.next().ok_or_else(|| format!("missing value for {flag}"))
        }
    }
}
