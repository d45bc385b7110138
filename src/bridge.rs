use crate::config::Config;
use crate::constants::GPT4_VISION_MODEL;
use crate::error::{BridgeError, Result};
use crate::normalize::{GenerationResult, ResponseNormalizer, ShapeKind, UsageSummary};
use crate::persist::ImagePersister;
use crate::reference::ImageResolver;
use crate::tools::{AnalyzeImageArgs, GenerateImageArgs, ToolCall};
use crate::utils::{
    build_generation_request, build_headers, build_vision_request, vision_instructions,
    RequestType,
};
use crate::vision::VisionApiResponse;
use log::{error, info};
use reqwest::Client;

/// Sends tool calls upstream and hands the bodies to the normalizer.
pub struct Bridge {
    client: Client,
    config: Config,
    normalizer: ResponseNormalizer,
}

impl Bridge {
    pub fn new(config: Config) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        let resolver = ImageResolver::new(client.clone());
        let persister = ImagePersister::new(config.output_dir.clone(), resolver);
        Ok(Self {
            client,
            config,
            normalizer: ResponseNormalizer::new(persister),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn call(&self, call: &ToolCall) -> Result<GenerationResult> {
        let outcome = match call {
            ToolCall::GenerateImage(args) => self.generate_image(args).await,
            ToolCall::AnalyzeImage(args) => self.analyze_image(args).await,
        };
        if let Err(err) = &outcome {
            error!("tool call failed: {}", err);
        }
        outcome
    }

    pub async fn generate_image(&self, args: &GenerateImageArgs) -> Result<GenerationResult> {
        let params = args.params(&self.config.default_model);
        let request = build_generation_request(args, &params.model);
        info!(
            "generating {} image(s) with {} via {}",
            args.image_count(),
            request.model(),
            request.path()
        );
        let body = self.send(&request).await?;
        self.normalizer
            .normalize(&params, &body, request.shape())
            .await
    }

    pub async fn analyze_image(&self, args: &AnalyzeImageArgs) -> Result<GenerationResult> {
        let model = args
            .model
            .as_deref()
            .filter(|model| !model.trim().is_empty())
            .unwrap_or(GPT4_VISION_MODEL);
        let resolver = self.normalizer.persister().resolver();
        let request = RequestType::Vision(build_vision_request(resolver, args, model).await?);
        info!("analyzing image with {}", model);
        let body = self.send(&request).await?;

        let response: VisionApiResponse =
            serde_json::from_str(&body).map_err(|err| BridgeError::UnsupportedShape {
                shape: ShapeKind::Chat.to_string(),
                reason: format!("unparsable vision body: {}", err),
            })?;
        let mut result = GenerationResult::new(model, vision_instructions(args));
        result.text = response.text();
        result.usage = response.usage.map(UsageSummary::from);
        Ok(result)
    }

    async fn send(&self, request: &RequestType) -> Result<String> {
        let url = self.config.endpoint(request.path());
        let response = self
            .client
            .post(&url)
            .headers(build_headers(&self.config.api_key)?)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BridgeError::upstream(status.as_u16(), &body));
        }
        Ok(body)
    }
}
