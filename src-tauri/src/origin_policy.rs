use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    LoadInWindow,
    OpenExternal,
    Ignore,
}

fn same_origin(left: &Url, right: &Url) -> bool {
    left.scheme() == right.scheme()
        && left.host_str() == right.host_str()
        && left.port_or_known_default() == right.port_or_known_default()
}

fn is_inert(target: &Url) -> bool {
    target.scheme() == "about" && target.path() == "blank"
}

fn is_web_url(target: &Url) -> bool {
    matches!(target.scheme(), "http" | "https" | "mailto")
}

pub fn navigation_decision(backend_url: &Url, target: &Url) -> NavigationDecision {
    if same_origin(backend_url, target) || is_inert(target) {
        return NavigationDecision::LoadInWindow;
    }
    if is_web_url(target) {
        NavigationDecision::OpenExternal
    } else {
        NavigationDecision::Ignore
    }
}

pub fn new_window_decision(target: &Url) -> NavigationDecision {
    if is_web_url(target) {
        NavigationDecision::OpenExternal
    } else {
        NavigationDecision::Ignore
    }
}
