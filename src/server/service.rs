use super::request::{parse_request, ParsedRequest};
use super::response::{write_reply, Reply};
use crate::docs::ApiDocs;
use crate::router::Router;
use crate::static_files::StaticAssets;
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use std::io;
use std::sync::Arc;
use tracing::{debug, warn};

/// HTTP service serving the documentation page, its assets and the host
/// application's routes.
#[derive(Clone)]
pub struct DocsService {
    docs: ApiDocs,
    router: Arc<Router>,
    assets: Arc<StaticAssets>,
}

impl DocsService {
    pub fn new(docs: ApiDocs, router: Router) -> Self {
        let assets = StaticAssets::new(docs.config().assets_dir.clone());
        Self {
            docs,
            router: Arc::new(router),
            assets: Arc::new(assets),
        }
    }

    pub fn docs(&self) -> &ApiDocs {
        &self.docs
    }

    /// Asset name when `path` lies below the docs endpoint.
    fn asset_name<'p>(&self, path: &'p str) -> Option<&'p str> {
        let endpoint = self.docs.config().endpoint.as_str();
        let rest = if endpoint == "/" {
            path.strip_prefix('/')
        } else {
            path.strip_prefix(endpoint)?.strip_prefix('/')
        }?;
        (!rest.is_empty()).then_some(rest)
    }

    /// Answer one request.
    pub fn respond(&self, req: &ParsedRequest) -> Reply {
        let endpoint = self.docs.config().endpoint.as_str();
        if req.is_read() {
            if crate::path::normalize(&req.path) == endpoint {
                return Reply::html(self.docs.render());
            }
            if let Some(name) = self.asset_name(&req.path) {
                match self.assets.load(name) {
                    Ok((body, content_type)) => return Reply::new(200, content_type, body),
                    Err(e) => debug!(asset = name, error = %e, "not a documentation asset"),
                }
            }
        }

        let Some(route_req) = req.to_route_request() else {
            warn!(method = %req.method, "unsupported request method");
            return Reply::json(400, &json!({"error": "Bad Request", "method": req.method}));
        };
        match self.router.dispatch(&route_req) {
            Some(res) => res.into(),
            None => Reply::json(
                404,
                &json!({"error": "Not Found", "method": req.method, "path": req.path}),
            ),
        }
    }
}

impl HttpService for DocsService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let parsed = parse_request(req);
        write_reply(res, self.respond(&parsed));
        Ok(())
    }
}
