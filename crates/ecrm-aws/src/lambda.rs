//! Function operations on AWS Lambda.

use async_trait::async_trait;
use aws_sdk_lambda::types::{FunctionConfiguration, PackageType};
use aws_sdk_lambda::Client;
use ecrm_core::api::{FunctionApi, FunctionImage, FunctionInfo};
use ecrm_core::Result;

use crate::api_error;

/// [`FunctionApi`] backed by the Lambda API.
#[derive(Debug, Clone)]
pub struct LambdaFunctions {
    client: Client,
}

impl LambdaFunctions {
    /// Creates a function client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

fn function_info(function: &FunctionConfiguration) -> Option<FunctionInfo> {
    Some(FunctionInfo {
        name: function.function_name()?.to_string(),
        image_packaged: matches!(function.package_type(), Some(PackageType::Image)),
    })
}

#[async_trait]
impl FunctionApi for LambdaFunctions {
    async fn list_functions(&self) -> Result<Vec<FunctionInfo>> {
        let mut pages = self.client.list_functions().into_paginator().send();
        let mut functions = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| api_error("ListFunctions", e))?;
            functions.extend(page.functions().iter().filter_map(function_info));
        }
        Ok(functions)
    }

    async fn function_image(&self, name: &str) -> Result<Option<FunctionImage>> {
        let output = self
            .client
            .get_function()
            .function_name(name)
            .send()
            .await
            .map_err(|e| api_error("GetFunction", e))?;
        Ok(output.code().and_then(|code| {
            Some(FunctionImage {
                image_uri: code.image_uri()?.to_string(),
                resolved_image_uri: code.resolved_image_uri().map(ToString::to_string),
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_info_package_type() {
        let image = FunctionConfiguration::builder()
            .function_name("resize")
            .package_type(PackageType::Image)
            .build();
        let zip = FunctionConfiguration::builder()
            .function_name("legacy")
            .package_type(PackageType::Zip)
            .build();

        assert!(function_info(&image).unwrap().image_packaged);
        assert!(!function_info(&zip).unwrap().image_packaged);
        assert!(function_info(&FunctionConfiguration::builder().build()).is_none());
    }
}
