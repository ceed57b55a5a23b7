/// Cleans one raw config line.
///
/// Trims whitespace, drops a trailing `#` comment or a `//` comment (the
/// latter only at line start or after a space or `;`, so paths and URLs
/// containing `//` survive) and removes the statement-terminating `;`.
/// Blank and comment-only lines come back empty.
pub fn normalize(line: &str) -> String {
    let line = line.trim();
    let cut = comment_start(line).unwrap_or(line.len());
    line[..cut]
        .trim_end_matches(|c: char| c == ';' || c.is_whitespace())
        .to_string()
}

fn comment_start(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let hash = line.find('#');
    let slashes = (0..bytes.len().saturating_sub(1)).find(|&i| {
        bytes[i] == b'/'
            && bytes[i + 1] == b'/'
            && (i == 0 || bytes[i - 1] == b' ' || bytes[i - 1] == b';')
    });
    match (hash, slashes) {
        (Some(h), Some(s)) => Some(h.min(s)),
        (h, s) => h.or(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn strips_hash_comments() {
        assert_eq!(normalize("  root www; # document root"), "root www");
        assert_eq!(normalize("# whole line"), "");
    }

    #[test]
    fn strips_slash_comments_only_after_space_or_semicolon() {
        assert_eq!(normalize("listen 8080; // main port"), "listen 8080");
        assert_eq!(normalize("listen 8080;// main port"), "listen 8080");
        assert_eq!(normalize("// commented out"), "");
        assert_eq!(
            normalize("return http://example.com//x;"),
            "return http://example.com//x"
        );
    }

    #[test]
    fn removes_terminating_semicolon() {
        assert_eq!(normalize("index index.html;"), "index index.html");
        assert_eq!(normalize("index index.html"), "index index.html");
        assert_eq!(normalize("   ;  "), "");
    }

    #[test]
    fn blank_lines_become_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \t \r"), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "root www;;",
            "  location /images {  # pics",
            " //x",
            "a; ;",
            "path /a//b ; // trailing",
            "error_page 404 /404.html;#c",
            "; //",
            "x /// y",
            "}\t;",
            "server{",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "input {:?}", sample);
        }
    }

    #[test]
    fn random_lines_normalize_idempotently() {
        let alphabet: Vec<char> = " ;/#\t{}abcxyz.:".chars().collect();
        let mut rng = StdRng::seed_from_u64(0x0c0f);
        for _ in 0..20_000 {
            let len = rng.gen_range(0..24);
            let line: String = (0..len)
                .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
                .collect();
            let once = normalize(&line);
            assert_eq!(normalize(&once), once, "input {:?}", line);
            assert!(!once.ends_with(';'), "input {:?}", line);
            assert_eq!(once.trim(), once, "input {:?}", line);
        }
    }
}
