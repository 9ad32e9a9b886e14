//! Backend that shows the routing decision instead of rendering the page

use std::path::Path;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Response, StatusCode};
use maud::{html, Markup, DOCTYPE};
use serde_json::{json, Map, Value};
use vinext::vinext_router::ParamValue;
use vinext::{Backend, NotFoundRequest, RenderRequest, ResolvedRoute};

pub struct InspectorBackend {
    project: String,
}

impl InspectorBackend {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
        }
    }

    fn layout(&self, title: &str, content: Markup) -> Markup {
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="UTF-8";
                    title { (title) " · " (self.project) }
                }
                body {
                    (content)
                }
            }
        }
    }
}

fn kind(route: &ResolvedRoute) -> &'static str {
    match route {
        ResolvedRoute::App(route) if route.route_path.is_some() => "app route handler",
        ResolvedRoute::App(route) if route.is_slot_only() => "app slot-only route",
        ResolvedRoute::App(_) => "app page",
        ResolvedRoute::Pages(_) => "pages page",
        ResolvedRoute::PagesApi(_) => "pages api route",
    }
}

fn param_json(value: &ParamValue) -> Value {
    match value {
        ParamValue::Single(value) => Value::String(value.clone()),
        ParamValue::Multi(values) => Value::Array(values.iter().cloned().map(Value::String).collect()),
    }
}

fn file_rows(route: &ResolvedRoute) -> Vec<(&'static str, &Path)> {
    let mut rows = Vec::new();
    match route {
        ResolvedRoute::App(route) => {
            let single = [
                ("page", &route.page_path),
                ("route", &route.route_path),
                ("loading", &route.loading_path),
                ("error", &route.error_path),
                ("not-found", &route.not_found_path),
                ("forbidden", &route.forbidden_path),
                ("unauthorized", &route.unauthorized_path),
            ];
            for (label, path) in single {
                if let Some(path) = path {
                    rows.push((label, path.as_path()));
                }
            }
            rows.extend(route.layouts.iter().map(|p| ("layout", p.as_path())));
            rows.extend(route.templates.iter().map(|p| ("template", p.as_path())));
        }
        ResolvedRoute::Pages(route) | ResolvedRoute::PagesApi(route) => {
            rows.push(("page", route.file_path.as_path()));
        }
    }
    rows
}

fn html_response(status: StatusCode, markup: Markup) -> Response<Body> {
    let mut response = Response::new(Body::from(markup.into_string()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    response
}

#[async_trait]
impl Backend for InspectorBackend {
    async fn dispatch_api(&self, request: RenderRequest) -> anyhow::Result<Response<Body>> {
        let params: Map<String, Value> = request
            .resolution
            .params
            .iter()
            .map(|(name, value)| (name.clone(), param_json(value)))
            .collect();
        let files: Vec<Value> = file_rows(&request.resolution.route)
            .into_iter()
            .map(|(label, path)| json!({ "kind": label, "path": path.display().to_string() }))
            .collect();

        let body = json!({
            "method": request.method.as_str(),
            "pathname": request.pathname,
            "query": request.query,
            "route": request.resolution.route.pattern(),
            "kind": kind(&request.resolution.route),
            "params": params,
            "files": files,
        });

        let mut response = Response::new(Body::from(serde_json::to_vec_pretty(&body)?));
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(response)
    }

    async fn render_page(&self, request: RenderRequest) -> anyhow::Result<Response<Body>> {
        let route = &request.resolution.route;
        let mut params: Vec<_> = request.resolution.params.iter().collect();
        params.sort_by(|a, b| a.0.cmp(b.0));

        let slots: Vec<_> = match route {
            ResolvedRoute::App(route) => route.parallel_slots.iter().collect(),
            _ => Vec::new(),
        };

        let content = html! {
            h1 { (route.pattern()) }
            p { (kind(route)) " for " code { (request.pathname) } }
            @if let Some(query) = &request.query {
                p { "query: " code { (query) } }
            }
            @if !params.is_empty() {
                h2 { "Params" }
                table {
                    @for (name, value) in &params {
                        tr { td { code { (name) } } td { (value) } }
                    }
                }
            }
            h2 { "Files" }
            ul {
                @for (label, path) in file_rows(route) {
                    li { (label) ": " code { (path.display()) } }
                }
            }
            @if !slots.is_empty() {
                h2 { "Slots" }
                ul {
                    @for slot in &slots {
                        li {
                            "@" (slot.name) ": "
                            @match (&slot.page_path, &slot.default_path) {
                                (Some(page), _) => code { (page.display()) },
                                (None, Some(default)) => { "default " code { (default.display()) } },
                                (None, None) => "nothing",
                            }
                        }
                    }
                }
            }
        };

        Ok(html_response(StatusCode::OK, self.layout(route.pattern(), content)))
    }

    async fn render_not_found(&self, request: NotFoundRequest) -> anyhow::Result<Response<Body>> {
        let content = html! {
            h1 { "404" }
            p { "No route matches " code { (request.pathname) } }
        };
        Ok(html_response(StatusCode::NOT_FOUND, self.layout("Not Found", content)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, Method};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use vinext::vinext_router::{PageRoute, Params};
    use vinext::RouteResolution;

    fn request(route: ResolvedRoute, params: Params) -> RenderRequest {
        RenderRequest {
            method: Method::GET,
            pathname: "/blog/hello".into(),
            query: None,
            headers: HeaderMap::new(),
            body: Body::empty(),
            resolution: RouteResolution { route, params },
        }
    }

    fn blog_route() -> ResolvedRoute {
        ResolvedRoute::Pages(PageRoute {
            pattern: "/blog/:slug".into(),
            file_path: PathBuf::from("pages/blog/[slug].tsx"),
            is_dynamic: true,
            params: vec!["slug".into()],
        })
    }

    async fn body(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_page_shows_route_params_and_files() {
        let mut params = Params::new();
        params.insert("slug".into(), ParamValue::Single("hello".into()));

        let backend = InspectorBackend::new("demo");
        let response = backend.render_page(request(blog_route(), params)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let html = body(response).await;
        assert!(html.contains("<h1>/blog/:slug</h1>"));
        assert!(html.contains("hello"));
        assert!(html.contains("pages/blog/[slug].tsx"));
    }

    #[tokio::test]
    async fn test_api_answers_json() {
        let mut params = Params::new();
        params.insert("slug".into(), ParamValue::Multi(vec!["a".into(), "b".into()]));

        let backend = InspectorBackend::new("demo");
        let response = backend.dispatch_api(request(blog_route(), params)).await.unwrap();
        let value: Value = serde_json::from_str(&body(response).await).unwrap();
        assert_eq!(value["route"], "/blog/:slug");
        assert_eq!(value["params"]["slug"], json!(["a", "b"]));
    }
}
