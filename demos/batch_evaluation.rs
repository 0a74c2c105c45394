use dan_calc::plot::{sample_curve_parallel, SampleRange};

fn main() {
    pretty_env_logger::init();

    let range = SampleRange::new(-3.0, 3.0, 0.5).expect("valid range");
    let expression = "x^3 - 3*x";

    match sample_curve_parallel(expression, &range) {
        Ok(curve) => {
            println!("y = {}", expression);
            for (x, y) in curve.points() {
                println!("{:>6.2} {:>9.3}", x, y);
            }
        }
        Err(err) => println!("Error: {}", err),
    }
}
