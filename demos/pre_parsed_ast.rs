use dan_calc::ast::{Context, Evaluator};

fn main() {
    pretty_env_logger::init();

    let evaluator = Evaluator::new();

    let expression = "price * (1 + rate) ^ years";
    let ast = evaluator
        .parse_expression(expression)
        .expect("Failed to parse");
    println!("Parsed: {}", ast);
    println!("Variables: {:?}", ast.variables());

    let context: Context = [
        ("price".to_string(), 1000.0),
        ("rate".to_string(), 0.05),
        ("years".to_string(), 10.0),
    ]
    .into_iter()
    .collect();

    match evaluator.evaluate(&ast, &context) {
        Ok(result) => println!("Result: {}", result),
        Err(err) => println!("Error: {}", err),
    }
}
