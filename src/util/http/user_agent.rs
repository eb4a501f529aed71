use rand::Rng;

const CHROME_VERSIONS: [&str; 12] = [
    "133.0.6943.88", "133.0.6943.60", "132.0.6834.110", "132.0.6834.83",
    "131.0.6778.108", "131.0.6778.85", "130.0.6723.117", "130.0.6723.92",
    "129.0.6668.89", "129.0.6668.70", "128.0.6613.138", "128.0.6613.120",
];

const FIREFOX_VERSIONS: [&str; 8] = [
    "133.0", "132.0", "131.0", "130.0", "129.0", "128.0", "127.0", "126.0",
];

const EDGE_VERSIONS: [&str; 6] = [
    "133.0.3048.56", "132.0.2957.63", "131.0.2903.112",
    "130.0.2849.80", "129.0.2792.65", "128.0.2739.90",
];

// 行情接口只需要桌面瀏覽器的樣子
const DESKTOP_OS: [&str; 6] = [
    "Windows NT 10.0; Win64; x64",
    "Windows NT 11.0; Win64; x64",
    "Macintosh; Intel Mac OS X 10_15_7",
    "Macintosh; Intel Mac OS X 14_6_1",
    "X11; Linux x86_64",
    "X11; Ubuntu; Linux x86_64",
];

fn pick<'a>(rng: &mut impl Rng, items: &[&'a str]) -> &'a str {
    items[rng.random_range(0..items.len())]
}

fn gen_chrome_ua(rng: &mut impl Rng) -> String {
    format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{} Safari/537.36",
        pick(rng, &DESKTOP_OS),
        pick(rng, &CHROME_VERSIONS)
    )
}

fn gen_firefox_ua(rng: &mut impl Rng) -> String {
    let version = pick(rng, &FIREFOX_VERSIONS);
    format!(
        "Mozilla/5.0 ({}; rv:{}) Gecko/20100101 Firefox/{}",
        pick(rng, &DESKTOP_OS),
        version,
        version
    )
}

fn gen_edge_ua(rng: &mut impl Rng) -> String {
    let version = pick(rng, &EDGE_VERSIONS);
    let chrome_major = version.split('.').next().unwrap_or("133");
    format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{}.0.0.0 Safari/537.36 Edg/{}",
        pick(rng, &DESKTOP_OS[..2]),
        chrome_major,
        version
    )
}

pub fn gen_random_ua() -> String {
    let mut rng = rand::rng();
    match rng.random_range(0..10) {
        0..=5 => gen_chrome_ua(&mut rng), // 60% Chrome
        6..=7 => gen_firefox_ua(&mut rng),
        _ => gen_edge_ua(&mut rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ua_formats() {
        for _ in 0..100 {
            let ua = gen_random_ua();
            assert!(ua.starts_with("Mozilla/5.0"), "UA should start with Mozilla/5.0: {}", ua);
            assert!(ua.len() > 50, "UA should be reasonably long: {}", ua);
        }
    }

    #[test]
    fn test_edge_runs_on_windows() {
        let mut rng = rand::rng();
        for _ in 0..20 {
            let ua = gen_edge_ua(&mut rng);
            assert!(ua.contains("Windows NT"), "{}", ua);
            assert!(ua.contains("Edg/"), "{}", ua);
        }
    }
}
