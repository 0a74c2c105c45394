use dan_calc::evaluate;

fn main() {
    pretty_env_logger::init();

    for expression in ["2 + 3 * 4", "-2^2", "(1 + 2) / 0", "sin(1)", "x + 1"] {
        match evaluate(expression) {
            Ok(result) => println!("{} = {}", expression, result),
            Err(err) => println!("{} -> Error: {}", expression, err),
        }
    }
}
