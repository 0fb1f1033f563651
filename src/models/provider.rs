use serde::Deserialize;

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// `POST /oauth/token` response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CobLoc {
    pub id: u64,
}

/// `PUT /v2/cob/{txid}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct CobResponse {
    pub txid: String,
    pub status: String,
    #[serde(default)]
    pub loc: Option<CobLoc>,
}

/// QR code response, from `/v2/cob/{txid}/qrcode` or `/v2/loc/{id}/qrcode`.
#[derive(Debug, Clone, Deserialize)]
pub struct QrCodeResponse {
    pub qrcode: String,
    #[serde(rename = "imagemQrcode", default)]
    pub imagem_qrcode: Option<String>,
    #[serde(rename = "linkVisualizacao", default)]
    pub link_visualizacao: Option<String>,
}
