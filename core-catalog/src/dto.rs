//! Wire types for the catalog HTTP API.
//!
//! Every response carries `code` (200 on success) and an optional
//! `message`. Fields the core does not use are not declared; missing fields
//! fall back to their defaults.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct BaseDto {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
}

impl BaseDto {
    pub fn is_success(&self) -> bool {
        self.code == 200
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BannerListDto {
    #[serde(default)]
    pub banners: Vec<BannerDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BannerDto {
    pub image_url: String,
    pub target_id: i64,
    pub target_type: i64,
    pub title_color: String,
    pub type_title: String,
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct IconListDto {
    #[serde(default)]
    pub data: Vec<IconDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IconDto {
    pub id: i64,
    pub icon_url: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PersonalizedListDto {
    #[serde(default)]
    pub result: Vec<PersonalizedDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalizedDto {
    pub id: i64,
    pub name: String,
    pub pic_url: String,
    pub play_count: i64,
    #[serde(rename = "type")]
    pub kind: i64,
}

/// Song listing shared by `playlist/track/all` and `album`.
#[derive(Debug, Default, Deserialize)]
pub struct SongListDto {
    #[serde(default)]
    pub songs: Vec<SongDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SongDto {
    pub id: i64,
    pub name: String,
    #[serde(rename = "al")]
    pub album: SongAlbumDto,
    #[serde(rename = "ar")]
    pub artists: Vec<ArtistDto>,
    pub mv: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SongAlbumDto {
    pub id: i64,
    pub name: String,
    pub pic_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ArtistDto {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopListDto {
    #[serde(default)]
    pub list: Vec<TopChartDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopChartDto {
    pub id: i64,
    pub name: String,
    pub cover_img_url: String,
    pub description: Option<String>,
    pub play_count: i64,
    pub update_frequency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewestAlbumListDto {
    #[serde(default)]
    pub albums: Vec<NewestAlbumDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewestAlbumDto {
    pub id: i64,
    pub name: String,
    pub pic_url: String,
    pub artists: Vec<ArtistDto>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SongUrlListDto {
    #[serde(default)]
    pub data: Vec<SongUrlDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SongUrlDto {
    pub id: i64,
    pub url: Option<String>,
    /// Track length in milliseconds.
    pub time: u64,
    /// Non-zero when the stream is paid content.
    pub payed: i64,
}
