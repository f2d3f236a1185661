use cfg_if::cfg_if;
use log::{error, warn};
use wgpu::SurfaceError;
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::app::Application;
use crate::tracer::Settings;

pub mod app;
pub mod camera;
pub mod context;
pub mod tracer;
pub mod util;

// wasm32 환경에서만 wasm_bindgen 활용
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

// wasm 연결시 아래 함수를 시작점으로 삼도록 함.
#[cfg_attr(target_arch = "wasm32", wasm_bindgen(start))]
pub fn run() {
    // 로거 초기화
    cfg_if! {
        // 만약 현재 환경이 wasm32라면
        if #[cfg(target_arch = "wasm32")] {
            // panic 발생시 웹 브라우저의 console.err에 로그 띄우기
            std::panic::set_hook(Box::new(console_error_panic_hook::hook));
            if let Err(error) = console_log::init_with_level(log::Level::Info) {
                web_sys::console::error_1(&format!("로거 초기화 실패: {}", error).into());
            }
            wasm_bindgen_futures::spawn_local(start());
        } else {
            // 아니면 기본적인 로거만 불러오기
            env_logger::init();
            pollster::block_on(start());
        }
    }
}

async fn start() {
    let event_loop = EventLoop::new();
    let window = match WindowBuilder::new()
        .with_title("Glowtrace: Path Tracer")
        .build(&event_loop)
    {
        Ok(window) => window,
        Err(e) => {
            error!("창을 만들 수 없음: {}", e);
            return;
        }
    };

    #[cfg(target_arch = "wasm32")]
    {
        // 브라우저에선 canvas를 직접 붙여줘야 보임
        use winit::platform::web::WindowExtWebSys;

        let attached = web_sys::window()
            .and_then(|win| win.document())
            .and_then(|doc| doc.body())
            .and_then(|body| {
                let canvas = web_sys::Element::from(window.canvas());
                body.append_child(&canvas).ok()
            });
        if attached.is_none() {
            error!("canvas를 문서에 붙일 수 없음");
            return;
        }
    }

    let mut app = match Application::new(window, Settings::default()).await {
        Ok(app) => app,
        Err(e) => {
            error!("초기화 실패: {}", e);
            return;
        }
    };

    event_loop.run(move |event, _, control_flow| match event {
        Event::WindowEvent {
            ref event,
            window_id,
        } if window_id == app.window.id() => {
            if !app.input(event) {
                match event {
                    // 만약 앱을 운영체제에서 닫으려고 하거나
                    WindowEvent::CloseRequested |
                    // 키보드 입력이 들어왔고
                    WindowEvent::KeyboardInput {
                        input: KeyboardInput {
                            // 키보드가 새로 눌러졌으며, 그 눌러진 키가 ESC라면
                            state: ElementState::Pressed, virtual_keycode: Some(VirtualKeyCode::Escape), ..
                        }, ..
                    } => *control_flow = ControlFlow::ExitWithCode(0), // 나가기

                    WindowEvent::Resized(physical_size) => app.resize(*physical_size),
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => app.resize(**new_inner_size),

                    _ => {}
                }
            }
        }
        Event::RedrawRequested(window_id) if window_id == app.window.id() => match app.update() {
            Ok(_) => {}
            // surface를 잃어버렸으면 다시 설정
            Err(SurfaceError::Lost | SurfaceError::Outdated) => app.resize(app.size()),
            Err(SurfaceError::OutOfMemory) => {
                error!("GPU 메모리 부족");
                *control_flow = ControlFlow::ExitWithCode(1);
            }
            // 나머지(Timeout)는 다음 프레임에 다시
            Err(e) => warn!("{:?}", e),
        },
        // 매 프레임 샘플 하나씩 더해야 하니 계속 다시 그려달라고 함
        Event::MainEventsCleared => app.window.request_redraw(),
        _ => {}
    });
}
