pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Value of the first cookie called `name` in a `Cookie`-style header
/// (`a=1; b=2`). Returns `None` when the cookie is absent. The value ends
/// at the next `=`, so `k=a=b` yields `a`.
pub fn first_cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header
        .split(';')
        .map(str::trim)
        .find_map(|pair| {
            let mut parts = pair.split('=');
            let key = parts.next()?;
            if key == name {
                Some(parts.next().unwrap_or(""))
            } else {
                None
            }
        })
}

/// Token for the `X-CSRFToken` header; empty when no `csrftoken` cookie is set.
pub fn csrf_token(cookie_header: &str) -> String {
    first_cookie_value(cookie_header, CSRF_COOKIE).unwrap_or_default().to_string()
}
