use rand::{distributions::Alphanumeric, thread_rng, Rng};

pub fn random_string(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(length)
        .collect()
}

/// A digits-only code, suitable for typing from a phone screen
pub fn numeric_code(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| char::from_digit(rng.gen_range(0..10), 10).expect("digit is valid"))
        .take(length)
        .collect()
}
