use crate::error::SourceError;
use crate::network::packet::RawFrame;
use log::{debug, warn};
use pcap_parser::pcapng::Block;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, Linktype, PcapBlockOwned, PcapError, PcapNGReader};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::Path;

/// pcap_parserの読み込みバッファ (64KB)
const BUFFER_SIZE: usize = 65536;

/// キャプチャ順にフレームを1つずつ返す
pub trait FrameSource {
    /// 次のフレーム。終端に達したら `Ok(None)`
    fn next_frame(&mut self) -> Result<Option<RawFrame>, SourceError>;
}

/// pcap / pcapng ファイルからフレームを読み出す
pub struct PcapFileSource {
    reader: Box<dyn PcapReaderIterator + Send>,
    frame_number: u64,
    link_type: Option<Linktype>,
}

impl PcapFileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SourceError::Open {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_reader(file)
    }

    /// 先頭4バイトのマジックナンバーで形式を判別する
    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Result<Self, SourceError> {
        let mut stream = BufReader::with_capacity(BUFFER_SIZE, reader);

        // マジックナンバーは消費せずに覗くだけにする
        let peeked = stream.fill_buf()?;
        if peeked.len() < 4 {
            return Err(SourceError::Io(std::io::Error::new(
                ErrorKind::UnexpectedEof,
                "マジックナンバーを読み込めません",
            )));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&peeked[..4]);

        let reader: Box<dyn PcapReaderIterator + Send> = match magic {
            // pcap (リトル/ビッグエンディアン, マイクロ秒/ナノ秒)
            [0xd4, 0xc3, 0xb2, 0xa1]
            | [0xa1, 0xb2, 0xc3, 0xd4]
            | [0x4d, 0x3c, 0xb2, 0xa1]
            | [0xa1, 0xb2, 0x3c, 0x4d] => {
                let reader = LegacyPcapReader::new(BUFFER_SIZE, stream).map_err(|e| {
                    SourceError::Parse(format!("pcapヘッダーの解析に失敗しました: {}", e))
                })?;
                Box::new(reader)
            }
            // pcapng
            [0x0a, 0x0d, 0x0d, 0x0a] => {
                let reader = PcapNGReader::new(BUFFER_SIZE, stream).map_err(|e| {
                    SourceError::Parse(format!("pcapngヘッダーの解析に失敗しました: {}", e))
                })?;
                Box::new(reader)
            }
            _ => return Err(SourceError::UnknownFormat(magic)),
        };

        Ok(Self {
            reader,
            frame_number: 0,
            link_type: None,
        })
    }

    /// これまでに返したフレーム数
    pub fn frame_count(&self) -> u64 {
        self.frame_number
    }

    pub fn link_type(&self) -> Option<Linktype> {
        self.link_type
    }

    fn set_link_type(&mut self, link_type: Linktype) {
        if link_type != Linktype::ETHERNET && self.link_type != Some(link_type) {
            // リンク層の種類に関わらずEthernetとしてデコードする
            warn!(
                "リンクタイプ {:?} はEthernetではありません。Ethernetとしてデコードします",
                link_type
            );
        }
        self.link_type = Some(link_type);
    }

    fn frame(&mut self, data: &[u8], caplen: u32) -> RawFrame {
        self.frame_number += 1;
        // pcapngのデータは32ビット境界までパディングされている
        let captured = (caplen as usize).min(data.len());
        RawFrame::new(self.frame_number, data[..captured].to_vec())
    }
}

impl FrameSource for PcapFileSource {
    fn next_frame(&mut self) -> Result<Option<RawFrame>, SourceError> {
        loop {
            let (offset, frame, link_type) = match self.reader.next() {
                Ok((offset, block)) => match block {
                    PcapBlockOwned::Legacy(packet) => {
                        (offset, Some((packet.data.to_vec(), packet.caplen)), None)
                    }
                    PcapBlockOwned::LegacyHeader(header) => (offset, None, Some(header.network)),
                    PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
                        (offset, None, Some(idb.linktype))
                    }
                    PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => {
                        (offset, Some((epb.data.to_vec(), epb.caplen)), None)
                    }
                    PcapBlockOwned::NG(Block::SimplePacket(spb)) => {
                        // SPBには捕捉長が無いので元のパケット長で切り詰める
                        (offset, Some((spb.data.to_vec(), spb.origlen)), None)
                    }
                    PcapBlockOwned::NG(_) => (offset, None, None),
                },
                Err(PcapError::Eof) => return Ok(None),
                Err(PcapError::Incomplete(_)) => {
                    self.reader.refill().map_err(|e| {
                        SourceError::Parse(format!("読み込みバッファの補充に失敗しました: {}", e))
                    })?;
                    continue;
                }
                Err(e) => {
                    return Err(SourceError::Parse(format!(
                        "ブロックの解析に失敗しました: {}",
                        e
                    )))
                }
            };

            self.reader.consume(offset);

            if let Some(link_type) = link_type {
                self.set_link_type(link_type);
            }

            if let Some((data, caplen)) = frame {
                let frame = self.frame(&data, caplen);
                debug!("フレーム #{} を読み込みました ({} バイト)", frame.ordinal(), frame.len());
                return Ok(Some(frame));
            }
        }
    }
}

/// メモリ上のフレーム列をそのまま返すソース
#[derive(Debug, Default)]
pub struct FrameQueue {
    frames: VecDeque<RawFrame>,
}

impl FrameQueue {
    /// バイト列に1始まりの通し番号を付けて並べる
    pub fn from_buffers<I>(buffers: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        let frames = buffers
            .into_iter()
            .enumerate()
            .map(|(i, data)| RawFrame::new(i as u64 + 1, data))
            .collect();
        Self { frames }
    }
}

impl FrameSource for FrameQueue {
    fn next_frame(&mut self) -> Result<Option<RawFrame>, SourceError> {
        Ok(self.frames.pop_front())
    }
}
