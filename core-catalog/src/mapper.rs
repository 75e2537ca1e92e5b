//! DTO to domain conversions, plus the stream-URL merge.

use crate::dto::{
    ArtistDto, BannerDto, IconDto, NewestAlbumDto, PersonalizedDto, SongDto, SongUrlDto,
    TopChartDto,
};
use crate::models::{
    AlbumSummary, Banner, Chart, ChartSummary, DiscoveryIcon, PlaylistSummary, RecommendedEntry,
    StreamInfo, Track, TrackId, TrackSummary,
};
use std::collections::HashMap;

const ARTIST_SEPARATOR: &str = " - ";

/// Playlists beyond this many are shown as a carousel plus the rest.
const CAROUSEL_SIZE: usize = 4;

fn join_artists(artists: &[ArtistDto]) -> String {
    artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(ARTIST_SEPARATOR)
}

impl From<BannerDto> for Banner {
    fn from(dto: BannerDto) -> Self {
        Self {
            image_url: dto.image_url,
            target_id: dto.target_id,
            target_type: dto.target_type,
            title_color: dto.title_color,
            type_title: dto.type_title,
        }
    }
}

impl From<IconDto> for DiscoveryIcon {
    fn from(dto: IconDto) -> Self {
        Self {
            id: dto.id,
            icon_url: dto.icon_url,
            name: dto.name,
            url: dto.url,
        }
    }
}

impl From<PersonalizedDto> for PlaylistSummary {
    fn from(dto: PersonalizedDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            pic_url: dto.pic_url,
            play_count: dto.play_count,
            kind: dto.kind,
        }
    }
}

impl From<SongDto> for TrackSummary {
    fn from(dto: SongDto) -> Self {
        Self {
            id: TrackId(dto.id),
            name: dto.name,
            artists: dto.artists.into_iter().map(|a| a.name).collect(),
            album_id: dto.album.id,
            album: dto.album.name,
            cover_url: dto.album.pic_url,
            mv_id: dto.mv,
        }
    }
}

impl From<TopChartDto> for ChartSummary {
    fn from(dto: TopChartDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            cover_url: dto.cover_img_url,
            description: dto.description.unwrap_or_default(),
            play_count: dto.play_count,
            update_frequency: dto.update_frequency.unwrap_or_default(),
        }
    }
}

impl From<NewestAlbumDto> for AlbumSummary {
    fn from(dto: NewestAlbumDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            pic_url: dto.pic_url,
            artist: join_artists(&dto.artists),
        }
    }
}

impl From<SongUrlDto> for StreamInfo {
    fn from(dto: SongUrlDto) -> Self {
        Self {
            id: TrackId(dto.id),
            url: dto.url.filter(|u| !u.is_empty()),
            duration_ms: dto.time,
            pay_gated: dto.payed != 0,
        }
    }
}

impl TrackSummary {
    /// Artists joined for list display.
    pub fn artist_line(&self) -> String {
        self.artists.join(ARTIST_SEPARATOR)
    }

    /// Unresolved playback track; the artist line carries the album name.
    pub fn to_track(&self) -> Track {
        let mut artist = self.artist_line();
        artist.push_str(ARTIST_SEPARATOR);
        artist.push_str(&self.album);
        Track::new(self.id.0, self.name.clone(), artist, self.cover_url.clone())
    }
}

impl ChartSummary {
    pub fn with_preview(self, preview: Vec<TrackSummary>) -> Chart {
        Chart {
            id: self.id,
            name: self.name,
            play_count: self.play_count,
            preview,
        }
    }
}

/// Group recommended playlists for display.
///
/// More than four playlists become one carousel of the first four followed
/// by the remaining playlists; otherwise every playlist is its own entry.
pub fn group_recommended(playlists: Vec<PlaylistSummary>) -> Vec<RecommendedEntry> {
    if playlists.len() <= CAROUSEL_SIZE {
        return playlists
            .into_iter()
            .map(RecommendedEntry::Playlist)
            .collect();
    }

    let mut playlists = playlists;
    let rest = playlists.split_off(CAROUSEL_SIZE);
    std::iter::once(RecommendedEntry::Carousel(playlists))
        .chain(rest.into_iter().map(RecommendedEntry::Playlist))
        .collect()
}

/// Merge stream resolutions into `tracks` by id.
///
/// Order and metadata of `tracks` are kept. A track with no matching entry
/// (or an empty URL) keeps `url = None`; entries for unknown ids are ignored.
/// Returns how many tracks are left without a URL.
pub fn merge_stream_info(tracks: &mut [Track], streams: Vec<StreamInfo>) -> usize {
    let by_id: HashMap<TrackId, StreamInfo> = streams.into_iter().map(|s| (s.id, s)).collect();

    for track in tracks.iter_mut() {
        if let Some(stream) = by_id.get(&track.id) {
            track.url = stream.url.clone();
            track.duration_ms = stream.duration_ms;
            track.pay_gated = stream.pay_gated;
        }
    }

    tracks.iter().filter(|t| !t.is_playable()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::SongAlbumDto;

    fn song(id: i64, artists: &[&str], album: &str) -> SongDto {
        SongDto {
            id,
            name: format!("Song {}", id),
            album: SongAlbumDto {
                id: 10,
                name: album.to_string(),
                pic_url: "https://img.example.com/al.jpg".to_string(),
            },
            artists: artists
                .iter()
                .map(|name| ArtistDto {
                    id: 0,
                    name: name.to_string(),
                })
                .collect(),
            mv: 0,
        }
    }

    fn stream(id: i64, url: Option<&str>) -> StreamInfo {
        StreamInfo {
            id: TrackId(id),
            url: url.map(str::to_string),
            duration_ms: 180_000,
            pay_gated: false,
        }
    }

    fn playlist(id: i64) -> PlaylistSummary {
        PlaylistSummary {
            id,
            name: format!("List {}", id),
            pic_url: String::new(),
            play_count: 0,
            kind: 0,
        }
    }

    #[test]
    fn test_artist_lines() {
        let summary = TrackSummary::from(song(1, &["A", "B"], "Album"));
        assert_eq!(summary.artist_line(), "A - B");
        assert_eq!(summary.to_track().artist, "A - B - Album");
        assert_eq!(summary.to_track().url, None);
    }

    #[test]
    fn test_merge_keeps_order_and_marks_missing() {
        let mut tracks: Vec<Track> = [1, 2, 3]
            .iter()
            .map(|&id| Track::new(id, format!("T{}", id), "", ""))
            .collect();

        let unresolved = merge_stream_info(
            &mut tracks,
            vec![
                stream(3, Some("https://cdn.example.com/3.mp3")),
                stream(1, Some("https://cdn.example.com/1.mp3")),
            ],
        );

        assert_eq!(unresolved, 1);
        let ids: Vec<i64> = tracks.iter().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(tracks[0].url.as_deref(), Some("https://cdn.example.com/1.mp3"));
        assert_eq!(tracks[1].url, None);
        assert_eq!(tracks[2].duration_ms, 180_000);
    }

    #[test]
    fn test_empty_url_is_unresolved() {
        let info = StreamInfo::from(SongUrlDto {
            id: 5,
            url: Some(String::new()),
            time: 1000,
            payed: 1,
        });
        assert_eq!(info.url, None);
        assert!(info.pay_gated);
    }

    #[test]
    fn test_group_small_list_unchanged() {
        let grouped = group_recommended((1..=4).map(playlist).collect());
        assert_eq!(grouped.len(), 4);
        assert!(grouped
            .iter()
            .all(|e| matches!(e, RecommendedEntry::Playlist(_))));
    }

    #[test]
    fn test_group_large_list_builds_carousel() {
        let grouped = group_recommended((1..=10).map(playlist).collect());
        assert_eq!(grouped.len(), 7);
        match &grouped[0] {
            RecommendedEntry::Carousel(items) => {
                let ids: Vec<i64> = items.iter().map(|p| p.id).collect();
                assert_eq!(ids, vec![1, 2, 3, 4]);
            }
            other => panic!("expected carousel, got {:?}", other),
        }
        assert!(matches!(&grouped[1], RecommendedEntry::Playlist(p) if p.id == 5));
    }

    #[test]
    fn test_album_artist_join() {
        let album = AlbumSummary::from(NewestAlbumDto {
            id: 1,
            name: "Album".to_string(),
            pic_url: String::new(),
            artists: vec![
                ArtistDto {
                    id: 1,
                    name: "A".to_string(),
                },
                ArtistDto {
                    id: 2,
                    name: "B".to_string(),
                },
            ],
        });
        assert_eq!(album.artist, "A - B");
    }
}
